//! Zoom account directory.
//!
//! Accounts come from the `ZOOM_ACCOUNTS` JSON array, from `[[zoom.accounts]]`
//! tables in the config file, or from the legacy single-account variables
//! (`ZOOM_ACCOUNT_ID`, `ZOOM_CLIENT_ID`, `ZOOM_CLIENT_SECRET`).

use std::collections::HashSet;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

pub const LEGACY_ACCOUNT_ID: &str = "default";
pub const LEGACY_ACCOUNT_NAME: &str = "Zoom";
pub const ALL_ACCOUNTS_VALUE: &str = "all";

#[derive(Clone, Debug)]
pub struct ZoomAccount {
    /// Routing key used in Slack payloads and the token cache.
    pub id: String,
    pub name: String,
    /// Zoom-side account id sent with the `account_credentials` grant.
    pub account_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Failed to parse ZOOM_ACCOUNTS: {0}")]
    Parse(String),
    #[error("ZOOM_ACCOUNTS must contain at least one account")]
    Empty,
    #[error("account #{index}: '{field}' is required")]
    MissingField { index: usize, field: &'static str },
    #[error("Duplicate account id '{0}'")]
    Duplicate(String),
    #[error("Zoom account not found: '{0}'")]
    NotFound(String),
    #[error("'{0}' is reserved and cannot be used as an account id")]
    ReservedId(String),
}

/// Account entry as written in `ZOOM_ACCOUNTS` (camelCase) or TOML (snake_case).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAccount {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "accountId")]
    pub account_id: Option<String>,
    #[serde(alias = "clientId")]
    pub client_id: Option<String>,
    #[serde(alias = "clientSecret")]
    pub client_secret: Option<String>,
}

pub fn parse_accounts_json(raw: &str) -> Result<Vec<ZoomAccount>, AccountError> {
    let entries: Vec<RawAccount> =
        serde_json::from_str(raw).map_err(|error| AccountError::Parse(error.to_string()))?;
    validate_accounts(entries)
}

pub fn validate_accounts(entries: Vec<RawAccount>) -> Result<Vec<ZoomAccount>, AccountError> {
    if entries.is_empty() {
        return Err(AccountError::Empty);
    }

    let mut seen = HashSet::new();
    let mut accounts = Vec::with_capacity(entries.len());
    for (offset, entry) in entries.into_iter().enumerate() {
        let index = offset + 1;
        let id = required(entry.id, index, "id")?;
        let account_id = required(entry.account_id, index, "accountId")?;
        let client_id = required(entry.client_id, index, "clientId")?;
        let client_secret = required(entry.client_secret, index, "clientSecret")?;

        if id.eq_ignore_ascii_case(ALL_ACCOUNTS_VALUE) {
            return Err(AccountError::ReservedId(id));
        }
        if !seen.insert(id.clone()) {
            return Err(AccountError::Duplicate(id));
        }

        let name = entry
            .name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| id.clone());

        accounts.push(ZoomAccount {
            id,
            name,
            account_id,
            client_id,
            client_secret: client_secret.into(),
        });
    }

    Ok(accounts)
}

pub fn legacy_account(account_id: String, client_id: String, client_secret: String) -> ZoomAccount {
    ZoomAccount {
        id: LEGACY_ACCOUNT_ID.to_owned(),
        name: LEGACY_ACCOUNT_NAME.to_owned(),
        account_id,
        client_id,
        client_secret: client_secret.into(),
    }
}

fn required(value: Option<String>, index: usize, field: &'static str) -> Result<String, AccountError> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or(AccountError::MissingField { index, field })
}

/// Which accounts a modal submission targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountSelection {
    One(String),
    All,
}

impl AccountSelection {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case(ALL_ACCOUNTS_VALUE) {
            Self::All
        } else {
            Self::One(trimmed.to_owned())
        }
    }

    pub fn as_value(&self) -> &str {
        match self {
            Self::One(id) => id,
            Self::All => ALL_ACCOUNTS_VALUE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AccountDirectory {
    accounts: Vec<ZoomAccount>,
}

impl AccountDirectory {
    pub fn new(accounts: Vec<ZoomAccount>) -> Result<Self, AccountError> {
        if accounts.is_empty() {
            return Err(AccountError::Empty);
        }
        let mut seen = HashSet::new();
        for account in &accounts {
            if !seen.insert(account.id.as_str()) {
                return Err(AccountError::Duplicate(account.id.clone()));
            }
        }
        Ok(Self { accounts })
    }

    pub fn all(&self) -> &[ZoomAccount] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn has_multiple(&self) -> bool {
        self.accounts.len() > 1
    }

    pub fn default_account(&self) -> &ZoomAccount {
        // `new` rejects empty lists.
        &self.accounts[0]
    }

    pub fn by_id(&self, id: &str) -> Result<&ZoomAccount, AccountError> {
        self.accounts
            .iter()
            .find(|account| account.id == id)
            .ok_or_else(|| AccountError::NotFound(id.to_owned()))
    }

    /// Looks up `id`, falling back to the default account when the id is absent or blank.
    pub fn by_id_or_default(&self, id: Option<&str>) -> Result<&ZoomAccount, AccountError> {
        match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.by_id(id),
            None => Ok(self.default_account()),
        }
    }

    pub fn resolve(&self, selection: &AccountSelection) -> Result<Vec<&ZoomAccount>, AccountError> {
        match selection {
            AccountSelection::All => Ok(self.accounts.iter().collect()),
            AccountSelection::One(id) => self.by_id(id).map(|account| vec![account]),
        }
    }
}
