mod bootstrap;
mod health;
mod ingress;
mod meetings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use meetbot_core::config::{AppConfig, LoadOptions};
use tokio::sync::Notify;

/// Set by the Lambda execution environment.
const LAMBDA_RUNTIME_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

fn init_logging(config: &AppConfig) {
    use meetbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            // CloudWatch adds its own timestamps.
            tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .without_time()
                .json()
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    if std::env::var_os(LAMBDA_RUNTIME_ENV).is_some() {
        tracing::info!(
            event_name = "system.server.started",
            correlation_id = "bootstrap",
            runtime = "lambda",
            "meetbot-server started"
        );
        return lambda_http::run(app.router).await.map_err(|error| anyhow::anyhow!(error));
    }

    serve(app).await
}

async fn serve(app: bootstrap::Application) -> Result<()> {
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        runtime = "http",
        bind_address = %address,
        "meetbot-server started"
    );

    let shutdown = Arc::new(Notify::new());
    let mut server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app.router)
                .with_graceful_shutdown(async move { shutdown.notified().await })
                .await
        }
    });

    tokio::select! {
        joined = &mut server => {
            joined??;
            return Ok(());
        }
        signal = wait_for_shutdown() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "meetbot-server stopping"
    );
    shutdown.notify_one();

    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            "in-flight requests did not finish before the grace period"
        ),
    }
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
