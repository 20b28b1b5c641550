use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    account_count: usize,
    command: String,
}

impl HealthState {
    pub fn new(account_count: usize, command: impl Into<String>) -> Self {
        Self { account_count, command: command.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub zoom_accounts: HealthCheck,
    pub account_count: usize,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let ready = state.account_count > 0;
    let zoom_accounts = if ready {
        HealthCheck {
            status: "ready",
            detail: format!("{} zoom account(s) configured", state.account_count),
        }
    } else {
        HealthCheck { status: "degraded", detail: "no zoom accounts configured".to_string() }
    };

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("meetbot-server answering {}", state.command),
        },
        zoom_accounts,
        account_count: state.account_count,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::extract::State;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{health, router, HealthState};

    #[tokio::test]
    async fn health_reports_configured_accounts() {
        let (status, payload) = health(State(HealthState::new(2, "/meeting"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.0.status, "ready");
        assert_eq!(payload.0.account_count, 2);
        assert_eq!(payload.0.zoom_accounts.detail, "2 zoom account(s) configured");
        assert!(payload.0.service.detail.contains("/meeting"));
    }

    #[tokio::test]
    async fn health_is_degraded_without_accounts() {
        let (status, payload) = health(State(HealthState::new(0, "/meeting"))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.0.status, "degraded");
        assert_eq!(payload.0.zoom_accounts.status, "degraded");
    }

    #[tokio::test]
    async fn health_route_serves_json() {
        let response = router(HealthState::new(1, "/meeting"))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["status"], "ready");
        assert_eq!(body["account_count"], 1);
    }
}
