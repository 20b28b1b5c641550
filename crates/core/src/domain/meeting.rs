use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::accounts::AccountSelection;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingId(pub String);

impl MeetingId {
    /// Meeting ids end up in request paths, so only alphanumerics are accepted.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid("meeting_id", "meeting id is empty"));
        }
        if !trimmed.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(DomainError::invalid(
                "meeting_id",
                format!("`{trimmed}` is not a Zoom meeting id"),
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for MeetingId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeetingAction {
    Create,
    List,
}

impl MeetingAction {
    pub fn as_value(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::List => "list",
        }
    }
}

impl FromStr for MeetingAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "list" => Ok(Self::List),
            other => Err(DomainError::invalid(
                "action",
                format!("unsupported action `{other}` (expected create|list)"),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingDuration(u32);

impl MeetingDuration {
    pub const DEFAULT: Self = Self(60);
    pub const CREATE_CHOICES: [u32; 3] = [30, 60, 90];
    pub const EDIT_CHOICES: [u32; 4] = [30, 60, 90, 120];
    const MAX_MINUTES: u32 = 24 * 60;

    pub fn from_minutes(minutes: u32) -> Result<Self, DomainError> {
        if minutes == 0 || minutes > Self::MAX_MINUTES {
            return Err(DomainError::invalid(
                "duration",
                format!("{minutes} minutes is outside 1..={}", Self::MAX_MINUTES),
            ));
        }
        Ok(Self(minutes))
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let minutes = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| DomainError::invalid("duration", format!("`{raw}` is not a number")))?;
        Self::from_minutes(minutes)
    }

    pub fn minutes(self) -> u32 {
        self.0
    }
}

impl Default for MeetingDuration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeetingPassword(String);

impl MeetingPassword {
    pub const MAX_LEN: usize = 10;
    const GENERATED_LEN: usize = 6;
    // Excludes look-alike characters (0/O, 1/l/I).
    const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let valid_len = (1..=Self::MAX_LEN).contains(&trimmed.chars().count());
        let valid_chars = trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '@' | '-' | '_' | '*'));
        if !valid_len || !valid_chars {
            return Err(DomainError::InvalidPassword);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let password = (0..Self::GENERATED_LEN)
            .map(|_| char::from(Self::ALPHABET[rng.gen_range(0..Self::ALPHABET.len())]))
            .collect();
        Self(password)
    }

    pub fn random() -> Self {
        Self::generate(&mut rand::thread_rng())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Values submitted from the main meeting modal. Missing values are resolved
/// against schedule defaults by the workflow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeetingForm {
    pub action: MeetingAction,
    pub account: AccountSelection,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration: Option<MeetingDuration>,
    pub topic: Option<String>,
    pub password: Option<MeetingPassword>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditForm {
    pub topic: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration: MeetingDuration,
    pub password: Option<MeetingPassword>,
}

pub fn default_topic(date: NaiveDate) -> String {
    format!("Slack Meeting ({})", date.format("%Y-%m-%d"))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| DomainError::invalid("date", format!("`{raw}` is not a YYYY-MM-DD date")))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| DomainError::invalid("time", format!("`{raw}` is not an HH:MM time")))
}

/// Returns `None` for absent or whitespace-only text.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_owned)
}
