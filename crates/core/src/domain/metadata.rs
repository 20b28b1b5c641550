//! JSON payloads that round-trip through Slack: modal `private_metadata` and
//! button `value` fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::meeting::MeetingId;
use crate::errors::DomainError;

/// Carried by the main meeting modal so the submission can reply to the
/// slash command's `response_url`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalState {
    pub response_url: String,
    pub channel_id: String,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditModalState {
    pub meeting_id: MeetingId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub response_url: String,
}

/// Delete button payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingActionRef {
    pub meeting_id: MeetingId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl MeetingActionRef {
    /// Accepts the JSON payload written by the list message, or a bare meeting id.
    pub fn parse_button_value(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            let parsed: Self = decode("delete payload", trimmed)?;
            let meeting_id = MeetingId::parse(parsed.meeting_id.as_str())?;
            return Ok(Self { meeting_id, account_id: parsed.account_id });
        }
        Ok(Self { meeting_id: MeetingId::parse(trimmed)?, account_id: None })
    }
}

/// Edit button payload; enough to prefill the edit modal without a Zoom round trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingEditRef {
    pub id: MeetingId,
    pub topic: String,
    pub start_time: String,
    pub duration: u32,
    #[serde(rename = "accountId", default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

pub fn encode<T: Serialize>(value: &T) -> Result<String, DomainError> {
    serde_json::to_string(value)
        .map_err(|error| DomainError::InvariantViolation(format!("metadata encoding failed: {error}")))
}

pub fn decode<T: DeserializeOwned>(field: &'static str, raw: &str) -> Result<T, DomainError> {
    serde_json::from_str(raw).map_err(|error| DomainError::invalid(field, error.to_string()))
}
