use std::sync::Arc;

use async_trait::async_trait;
use meetbot_core::domain::meeting::MeetingAction;
use meetbot_core::domain::metadata::ModalState;
use serde::Deserialize;
use thiserror::Error;

use crate::blocks::MessageTemplate;
use crate::messages;

/// Flat form fields Slack posts for a slash command.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlashCommandPayload {
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub response_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: String,
    pub preset_action: Option<MeetingAction>,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_id: String,
    pub response_url: String,
}

impl CommandEnvelope {
    pub fn modal_state(&self) -> ModalState {
        ModalState {
            response_url: self.response_url.clone(),
            channel_id: self.channel_id.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeetingCommand {
    Open(CommandEnvelope),
    Help { command: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("slash command `{0}` arrived without a trigger_id")]
    MissingTriggerId(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

/// Maps `/meeting [create|list|help]` onto a command. Any other text still
/// opens the modal, just without a preselected action.
pub fn normalize_meeting_command(
    payload: SlashCommandPayload,
    expected_command: &str,
) -> Result<MeetingCommand, CommandParseError> {
    if !payload.command.trim().eq_ignore_ascii_case(expected_command) {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let verb = payload.text.split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
    let preset_action = match verb.as_str() {
        "help" | "?" => return Ok(MeetingCommand::Help { command: payload.command }),
        "create" | "new" => Some(MeetingAction::Create),
        "list" | "ls" => Some(MeetingAction::List),
        _ => None,
    };

    if payload.trigger_id.trim().is_empty() {
        return Err(CommandParseError::MissingTriggerId(payload.command));
    }

    Ok(MeetingCommand::Open(CommandEnvelope {
        command: payload.command,
        preset_action,
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        trigger_id: payload.trigger_id,
        response_url: payload.response_url,
    }))
}

#[async_trait]
pub trait MeetingCommandService: Send + Sync {
    async fn open_meeting_modal(&self, envelope: &CommandEnvelope) -> Result<(), CommandRouteError>;
}

pub struct CommandRouter<S> {
    service: Arc<S>,
}

impl<S> CommandRouter<S>
where
    S: MeetingCommandService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Returns the message to send back in the HTTP response, or `None` when
    /// the command was answered by opening a modal.
    pub async fn route(
        &self,
        command: MeetingCommand,
    ) -> Result<Option<MessageTemplate>, CommandRouteError> {
        match command {
            MeetingCommand::Open(envelope) => {
                self.service.open_meeting_modal(&envelope).await?;
                Ok(None)
            }
            MeetingCommand::Help { command } => Ok(Some(messages::help_message(&command))),
        }
    }
}
