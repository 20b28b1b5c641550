//! Server-to-Server OAuth (`account_credentials` grant) with a per-account
//! token cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use meetbot_core::accounts::ZoomAccount;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::error::ZoomError;
use crate::types::TokenResponse;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone)]
struct CachedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

type TokenSlot = Arc<tokio::sync::Mutex<Option<CachedToken>>>;

pub struct ZoomAuthService {
    http: reqwest::Client,
    token_url: String,
    refresh_margin: Duration,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<String, TokenSlot>>,
}

impl ZoomAuthService {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        refresh_margin_secs: u64,
    ) -> Self {
        Self::with_clock(http, token_url, refresh_margin_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(
        http: reqwest::Client,
        token_url: impl Into<String>,
        refresh_margin_secs: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            refresh_margin: Duration::seconds(refresh_margin_secs.min(86_400) as i64),
            clock,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a bearer token for `account`, refreshing it when it expires
    /// within the refresh margin. Callers racing on the same account wait for
    /// a single refresh.
    pub async fn access_token(&self, account: &ZoomAccount) -> Result<SecretString, ZoomError> {
        let slot = self.slot(&account.id);
        let mut cached = slot.lock().await;

        if let Some(entry) = cached.as_ref() {
            if entry.expires_at > self.clock.now() + self.refresh_margin {
                debug!(account = %account.id, "using cached zoom token");
                return Ok(entry.token.clone());
            }
        }

        let fresh = self.fetch_token(account).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drops the cached token for `account_id` if it is still `rejected`.
    /// A token another caller already refreshed is kept.
    pub async fn invalidate(&self, account_id: &str, rejected: &SecretString) {
        let slot = self.slot(account_id);
        let mut cached = slot.lock().await;
        let still_rejected = cached
            .as_ref()
            .is_some_and(|entry| entry.token.expose_secret() == rejected.expose_secret());
        if still_rejected {
            *cached = None;
            info!(account = %account_id, "zoom token invalidated");
        }
    }

    fn slot(&self, account_id: &str) -> TokenSlot {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots.entry(account_id.to_owned()).or_default().clone()
    }

    async fn fetch_token(&self, account: &ZoomAccount) -> Result<CachedToken, ZoomError> {
        info!(account = %account.id, "requesting zoom access token");

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&account.client_id, Some(account.client_secret.expose_secret()))
            .form(&[
                ("grant_type", "account_credentials"),
                ("account_id", account.account_id.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(account = %account.id, status = %status, "zoom token request rejected");
            return Err(ZoomError::Auth { status: status.as_u16(), body });
        }

        let token: TokenResponse = response.json().await?;
        if token.access_token.is_empty() {
            return Err(ZoomError::Auth {
                status: status.as_u16(),
                body: "token endpoint returned empty access token".to_owned(),
            });
        }

        Ok(CachedToken {
            token: token.access_token.into(),
            expires_at: self.clock.now() + Duration::seconds(token.expires_in.max(0)),
        })
    }
}
