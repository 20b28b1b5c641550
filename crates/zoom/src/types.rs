use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListType {
    Scheduled,
    Live,
    #[default]
    Upcoming,
}

impl ListType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Upcoming => "upcoming",
        }
    }
}

#[derive(Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// Body of `POST /users/me/meetings`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CreateMeetingRequest {
    pub topic: String,
    #[serde(rename = "type")]
    pub meeting_type: u8,
    pub start_time: String,
    pub duration: u32,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl CreateMeetingRequest {
    pub const SCHEDULED: u8 = 2;

    pub fn scheduled(
        topic: impl Into<String>,
        start_time: impl Into<String>,
        duration: u32,
        timezone: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            meeting_type: Self::SCHEDULED,
            start_time: start_time.into(),
            duration,
            timezone: timezone.into(),
            password,
        }
    }
}

impl fmt::Debug for CreateMeetingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateMeetingRequest")
            .field("topic", &self.topic)
            .field("meeting_type", &self.meeting_type)
            .field("start_time", &self.start_time)
            .field("duration", &self.duration)
            .field("timezone", &self.timezone)
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

/// Body of `PATCH /meetings/{id}`. Unset fields are left untouched by Zoom.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateMeetingRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl fmt::Debug for UpdateMeetingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateMeetingRequest")
            .field("topic", &self.topic)
            .field("start_time", &self.start_time)
            .field("duration", &self.duration)
            .field("timezone", &self.timezone)
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ZoomMeeting {
    pub id: u64,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub join_url: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ListMeetingsResponse {
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_records: u32,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub meetings: Vec<ZoomMeeting>,
}

impl ListMeetingsResponse {
    /// Token for the next page, if Zoom reported one.
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|token| !token.is_empty())
    }
}
