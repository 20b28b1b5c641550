//! Slack surface of the meeting bot.
//!
//! - **Signing** (`signature`) - `v0` HMAC verification of inbound requests
//! - **Payloads** (`events`, `interactions`, `commands`) - slash commands,
//!   `view_submission` and `block_actions`, routed through [`events::EventDispatcher`]
//! - **Forms** (`forms`) - modal state into domain forms, with per-block errors
//! - **Block Kit** (`blocks`, `modals`, `messages`) - typed views and messages
//! - **Web API** (`web`) - `views.open` and `response_url` posts
//!
//! ```text
//! HTTP body → parse_request → EventDispatcher → handler → service (server crate)
//!                                                            ↓
//!                                  SlackApi ← modals / messages
//! ```

pub mod blocks;
pub mod commands;
pub mod events;
pub mod forms;
pub mod interactions;
pub mod messages;
pub mod modals;
pub mod signature;
pub mod web;

pub use events::{
    meeting_dispatcher, parse_request, BlockActionService, EventContext, EventDispatcher,
    EventHandlerError, HandlerResult, PayloadError, SlackEvent, ViewSubmissionOutcome,
    ViewSubmissionService,
};
pub use signature::{SignatureError, SignatureVerifier};
pub use web::{HttpSlackClient, SlackApi, SlackApiError};
