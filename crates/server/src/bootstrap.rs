use std::sync::Arc;

use axum::Router;
use meetbot_core::accounts::{AccountDirectory, AccountError};
use meetbot_core::config::{AppConfig, ConfigError, LoadOptions};
use meetbot_core::errors::DomainError;
use meetbot_core::schedule::Schedule;
use meetbot_slack::events::meeting_dispatcher;
use meetbot_slack::signature::SignatureVerifier;
use meetbot_slack::web::{HttpSlackClient, SlackApi, SlackApiError};
use meetbot_zoom::{Clock, HttpZoomClient, SystemClock, ZoomApi, ZoomError};
use thiserror::Error;
use tracing::info;

use crate::health::{self, HealthState};
use crate::ingress::{self, IngressState};
use crate::meetings::MeetingWorkflows;

pub struct Application {
    pub config: AppConfig,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Accounts(#[from] AccountError),
    #[error("schedule settings are invalid: {0}")]
    Schedule(#[from] DomainError),
    #[error("zoom client could not be built: {0}")]
    Zoom(#[from] ZoomError),
    #[error("slack client could not be built: {0}")]
    Slack(#[from] SlackApiError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        accounts = config.zoom.accounts.len(),
        "starting application bootstrap"
    );

    let zoom: Arc<dyn ZoomApi> = Arc::new(HttpZoomClient::from_config(&config.zoom)?);
    let slack: Arc<dyn SlackApi> = Arc::new(HttpSlackClient::from_config(&config.slack)?);
    let router = build_router(&config, zoom, slack, Arc::new(SystemClock))?;

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        command = %config.slack.command,
        timezone = %config.schedule.timezone,
        "application bootstrap complete"
    );
    Ok(Application { config, router })
}

/// Wires the Slack ingress and health routes around the given clients.
pub fn build_router(
    config: &AppConfig,
    zoom: Arc<dyn ZoomApi>,
    slack: Arc<dyn SlackApi>,
    clock: Arc<dyn Clock>,
) -> Result<Router, BootstrapError> {
    let accounts = AccountDirectory::new(config.zoom.accounts.clone())?;
    let schedule = Schedule::from_config(&config.schedule)?;
    let account_count = accounts.len();

    let workflows = Arc::new(MeetingWorkflows::new(
        accounts,
        schedule,
        zoom,
        slack,
        clock.clone(),
        config.zoom.detail_concurrency,
    ));
    let dispatcher = meeting_dispatcher(workflows, config.slack.command.clone());
    let verifier = SignatureVerifier::new(config.slack.signing_secret.clone());

    Ok(ingress::router(IngressState::new(dispatcher, verifier, clock))
        .merge(health::router(HealthState::new(account_count, config.slack.command.clone()))))
}
