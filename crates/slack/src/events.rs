use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use meetbot_core::errors::DomainError;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::{
    commands::{
        normalize_meeting_command, CommandParseError, CommandRouteError, CommandRouter,
        MeetingCommandService, SlashCommandPayload,
    },
    forms::FieldErrors,
    interactions::{BlockActionEvent, ViewSubmission},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    ViewSubmission(ViewSubmission),
    BlockAction(BlockActionEvent),
    UrlVerification { challenge: String },
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::ViewSubmission(_) => SlackEventType::ViewSubmission,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::UrlVerification { .. } => SlackEventType::UrlVerification,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    ViewSubmission,
    BlockAction,
    UrlVerification,
    Unsupported,
}

impl SlackEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SlashCommand => "slash_command",
            Self::ViewSubmission => "view_submission",
            Self::BlockAction => "block_actions",
            Self::UrlVerification => "url_verification",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("request body is empty")]
    Empty,
    #[error("malformed form body: {0}")]
    Form(String),
    #[error("malformed JSON payload: {0}")]
    Json(String),
    #[error("body is neither a slash command nor an interaction")]
    Unrecognized,
}

#[derive(Deserialize)]
struct EventsApiBody {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    challenge: Option<String>,
}

/// Decodes a raw Slack request body. JSON bodies come from the Events API;
/// form bodies carry either slash command fields or an interactivity
/// `payload`.
pub fn parse_request(body: &[u8]) -> Result<SlackEvent, PayloadError> {
    let Some(first) = body.iter().find(|byte| !byte.is_ascii_whitespace()) else {
        return Err(PayloadError::Empty);
    };

    if *first == b'{' {
        let parsed: EventsApiBody =
            serde_json::from_slice(body).map_err(|error| PayloadError::Json(error.to_string()))?;
        return Ok(match (parsed.kind.as_str(), parsed.challenge) {
            ("url_verification", Some(challenge)) => SlackEvent::UrlVerification { challenge },
            _ => SlackEvent::Unsupported { event_type: parsed.kind },
        });
    }

    let fields: HashMap<String, String> =
        serde_urlencoded::from_bytes(body).map_err(|error| PayloadError::Form(error.to_string()))?;
    if let Some(payload) = fields.get("payload") {
        return parse_interaction(payload);
    }
    if fields.contains_key("command") {
        let command: SlashCommandPayload = serde_urlencoded::from_bytes(body)
            .map_err(|error| PayloadError::Form(error.to_string()))?;
        return Ok(SlackEvent::SlashCommand(command));
    }

    Err(PayloadError::Unrecognized)
}

fn parse_interaction(payload: &str) -> Result<SlackEvent, PayloadError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|error| PayloadError::Json(error.to_string()))?;
    let kind = value.get("type").and_then(Value::as_str).unwrap_or_default().to_owned();

    match kind.as_str() {
        "view_submission" => serde_json::from_value(value)
            .map(SlackEvent::ViewSubmission)
            .map_err(|error| PayloadError::Json(error.to_string())),
        "block_actions" => serde_json::from_value(value)
            .map(SlackEvent::BlockAction)
            .map_err(|error| PayloadError::Json(error.to_string())),
        _ => Ok(SlackEvent::Unsupported { event_type: kind }),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

/// What the HTTP layer sends back to Slack.
#[derive(Clone, Debug, PartialEq)]
pub enum HandlerResult {
    /// Empty 200.
    Ack,
    Respond(Value),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("event service failure: {0}")]
    Service(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        event: &SlackEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        event: &SlackEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let event_type = event.event_type();
        let Some(handler) = self.handlers.get(&event_type) else {
            debug!(
                event_name = "slack.event.ignored",
                correlation_id = %ctx.correlation_id,
                event_type = event_type.as_str(),
                "no handler registered"
            );
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(event, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Registers every handler the meeting bot answers, all backed by `service`.
pub fn meeting_dispatcher<S>(service: Arc<S>, command: impl Into<String>) -> EventDispatcher
where
    S: MeetingCommandService + ViewSubmissionService + BlockActionService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(UrlVerificationHandler);
    dispatcher.register(SlashCommandHandler::new(service.clone(), command));
    dispatcher.register(ViewSubmissionHandler::new(service.clone()));
    dispatcher.register(BlockActionHandler::new(service));
    dispatcher
}

pub struct UrlVerificationHandler;

#[async_trait]
impl EventHandler for UrlVerificationHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::UrlVerification
    }

    async fn handle(
        &self,
        event: &SlackEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::UrlVerification { challenge } = event else {
            return Ok(HandlerResult::Ignored);
        };
        Ok(HandlerResult::Respond(json!({ "challenge": challenge })))
    }
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
    command: String,
}

impl<S> SlashCommandHandler<S>
where
    S: MeetingCommandService,
{
    pub fn new(service: Arc<S>, command: impl Into<String>) -> Self {
        Self { router: CommandRouter::new(service), command: command.into() }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: MeetingCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        event: &SlackEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = event else {
            return Ok(HandlerResult::Ignored);
        };

        let command = normalize_meeting_command(payload.clone(), &self.command)?;
        match self.router.route(command).await? {
            Some(message) => serde_json::to_value(message)
                .map(HandlerResult::Respond)
                .map_err(|error| EventHandlerError::Service(error.to_string())),
            None => Ok(HandlerResult::Ack),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewSubmissionOutcome {
    Close,
    Errors(FieldErrors),
}

#[async_trait]
pub trait ViewSubmissionService: Send + Sync {
    async fn submit_view(
        &self,
        submission: &ViewSubmission,
        ctx: &EventContext,
    ) -> Result<ViewSubmissionOutcome, EventHandlerError>;
}

pub struct ViewSubmissionHandler<S> {
    service: Arc<S>,
}

impl<S> ViewSubmissionHandler<S>
where
    S: ViewSubmissionService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ViewSubmissionHandler<S>
where
    S: ViewSubmissionService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ViewSubmission
    }

    async fn handle(
        &self,
        event: &SlackEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::ViewSubmission(submission) = event else {
            return Ok(HandlerResult::Ignored);
        };

        Ok(match self.service.submit_view(submission, ctx).await? {
            ViewSubmissionOutcome::Close => HandlerResult::Ack,
            ViewSubmissionOutcome::Errors(errors) => HandlerResult::Respond(errors.to_response()),
        })
    }
}

#[async_trait]
pub trait BlockActionService: Send + Sync {
    async fn handle_block_action(
        &self,
        event: &BlockActionEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

pub struct BlockActionHandler<S> {
    service: Arc<S>,
}

impl<S> BlockActionHandler<S>
where
    S: BlockActionService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for BlockActionHandler<S>
where
    S: BlockActionService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        event: &SlackEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(action) = event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_block_action(action, ctx).await?;
        Ok(HandlerResult::Ack)
    }
}
