use serde::Deserialize;
use thiserror::Error;

pub const MEETING_NOT_FOUND: i64 = 3001;
pub const MEETING_IN_PROGRESS: i64 = 3002;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ZoomError {
    #[error("zoom token request failed with status {status}: {body}")]
    Auth { status: u16, body: String },
    #[error("zoom api returned {status} (code {code:?}): {message}")]
    Api { status: u16, code: Option<i64>, message: String },
    #[error("zoom request failed: {0}")]
    Transport(String),
    #[error("zoom response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

impl ZoomError {
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let fallback = if body.trim().is_empty() { format!("HTTP {status}") } else { body.to_owned() };
        let message =
            parsed.message.filter(|message| !message.trim().is_empty()).unwrap_or(fallback);
        Self::Api { status, code: parsed.code, message }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(MEETING_NOT_FOUND)
    }

    /// Text suitable for showing to the Slack user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { code: Some(MEETING_NOT_FOUND), .. } => {
                "Meeting not found. It may already have been deleted.".to_owned()
            }
            Self::Api { code: Some(MEETING_IN_PROGRESS), .. } => {
                "The meeting is in progress. End it and try again.".to_owned()
            }
            Self::Api { message, .. } => format!("Zoom API error: {message}"),
            Self::Auth { .. } => {
                "Could not authenticate with Zoom. Check the account credentials.".to_owned()
            }
            Self::Transport(_) => "Could not reach Zoom. Please retry shortly.".to_owned(),
            Self::Decode(_) => "Zoom returned an unexpected response.".to_owned(),
        }
    }
}

impl From<reqwest::Error> for ZoomError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ZoomError;

    #[test]
    fn known_codes_get_friendly_messages() {
        let not_found =
            ZoomError::from_body(404, r#"{"code":3001,"message":"Meeting does not exist: 42."}"#);
        assert!(not_found.is_not_found());
        assert_eq!(not_found.user_message(), "Meeting not found. It may already have been deleted.");

        let in_progress =
            ZoomError::from_body(400, r#"{"code":3002,"message":"Meeting is in progress"}"#);
        assert_eq!(in_progress.user_message(), "The meeting is in progress. End it and try again.");
    }

    #[test]
    fn other_codes_surface_zoom_message() {
        let error = ZoomError::from_body(400, r#"{"code":300,"message":"Invalid start_time"}"#);
        assert_eq!(error.user_message(), "Zoom API error: Invalid start_time");
    }

    #[test]
    fn non_json_bodies_are_kept_verbatim() {
        let error = ZoomError::from_body(502, "upstream unavailable");
        assert_eq!(
            error,
            ZoomError::Api { status: 502, code: None, message: "upstream unavailable".to_owned() }
        );
        assert_eq!(ZoomError::from_body(500, "").code(), None);
    }
}
