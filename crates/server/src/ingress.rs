//! Slack's HTTP entry point: verify, parse, dispatch.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use meetbot_core::errors::InterfaceError;
use meetbot_slack::events::{
    parse_request, DispatchError, EventContext, EventDispatcher, EventHandlerError,
    HandlerResult,
};
use meetbot_slack::messages::error_message;
use meetbot_slack::signature::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use meetbot_zoom::Clock;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct IngressState {
    dispatcher: Arc<EventDispatcher>,
    verifier: Arc<SignatureVerifier>,
    clock: Arc<dyn Clock>,
}

impl IngressState {
    pub fn new(
        dispatcher: EventDispatcher,
        verifier: SignatureVerifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { dispatcher: Arc::new(dispatcher), verifier: Arc::new(verifier), clock }
    }
}

/// Slack apps usually point slash commands and interactivity at separate URLs;
/// all of them land on the same handler.
pub fn router(state: IngressState) -> Router {
    Router::new()
        .route("/", post(slack_request))
        .route("/slack/events", post(slack_request))
        .route("/slack/commands", post(slack_request))
        .route("/slack/interactions", post(slack_request))
        .with_state(state)
}

pub async fn slack_request(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = uuid::Uuid::new_v4().to_string();
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

    if let Err(error) = state.verifier.verify(
        header(SIGNATURE_HEADER),
        header(TIMESTAMP_HEADER),
        &body,
        state.clock.now(),
    ) {
        warn!(
            event_name = "slack.request.rejected",
            correlation_id = %correlation_id,
            error = %error,
            "slack signature verification failed"
        );
        return interface_error(InterfaceError::Unauthorized {
            message: error.to_string(),
            correlation_id,
        });
    }

    let event = match parse_request(&body) {
        Ok(event) => event,
        Err(error) => {
            warn!(
                event_name = "slack.request.unparseable",
                correlation_id = %correlation_id,
                error = %error,
                "slack request body could not be parsed"
            );
            return interface_error(InterfaceError::BadRequest {
                message: error.to_string(),
                correlation_id,
            });
        }
    };

    info!(
        event_name = "slack.request.received",
        correlation_id = %correlation_id,
        event_type = event.event_type().as_str(),
        "slack request received"
    );

    let ctx = EventContext { correlation_id };
    match state.dispatcher.dispatch(&event, &ctx).await {
        Ok(HandlerResult::Respond(body)) => (StatusCode::OK, Json(body)).into_response(),
        Ok(HandlerResult::Ack | HandlerResult::Ignored) => StatusCode::OK.into_response(),
        Err(DispatchError::Handler(EventHandlerError::Parse(error))) => {
            warn!(
                event_name = "slack.command.rejected",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "slash command rejected"
            );
            // Slack only shows the reply to the user when the status is 200.
            (StatusCode::OK, Json(error_message(&error.to_string()))).into_response()
        }
        Err(error) => {
            error!(
                event_name = "slack.request.failed",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "slack request handling failed"
            );
            interface_error(InterfaceError::Internal {
                message: error.to_string(),
                correlation_id: ctx.correlation_id,
            })
        }
    }
}

fn interface_error(error: InterfaceError) -> Response {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({
        "error": error.user_message(),
        "correlation_id": error.correlation_id(),
    });
    (status, Json(body)).into_response()
}
