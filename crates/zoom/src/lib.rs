//! Zoom Server-to-Server OAuth and the meetings REST API.

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::{Clock, SystemClock, ZoomAuthService};
pub use client::{HttpZoomClient, ZoomApi};
pub use error::ZoomError;
pub use types::{
    CreateMeetingRequest, ListMeetingsResponse, ListType, UpdateMeetingRequest, ZoomMeeting,
};
