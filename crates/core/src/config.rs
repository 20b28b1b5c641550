use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accounts::{legacy_account, parse_accounts_json, validate_accounts, AccountError, RawAccount, ZoomAccount};
use crate::domain::meeting::MeetingDuration;

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["meetbot.toml", "config/meetbot.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub zoom: ZoomConfig,
    pub schedule: ScheduleConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub signing_secret: SecretString,
    pub bot_token: SecretString,
    pub api_base_url: String,
    pub command: String,
}

#[derive(Clone, Debug)]
pub struct ZoomConfig {
    pub api_base_url: String,
    pub token_url: String,
    pub timeout_secs: u64,
    pub token_refresh_margin_secs: u64,
    pub list_page_size: u32,
    pub max_list_pages: u32,
    pub detail_concurrency: usize,
    pub accounts: Vec<ZoomAccount>,
}

#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    pub timezone: String,
    pub utc_offset_minutes: i32,
    pub default_start_time: String,
    pub default_duration_minutes: u32,
    pub list_days: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub slack_signing_secret: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_api_base_url: Option<String>,
    pub zoom_api_base_url: Option<String>,
    pub zoom_token_url: Option<String>,
    pub zoom_accounts_json: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("zoom.accounts: {0}")]
    Accounts(#[from] AccountError),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                signing_secret: String::new().into(),
                bot_token: String::new().into(),
                api_base_url: "https://slack.com/api".to_string(),
                command: "/meeting".to_string(),
            },
            zoom: ZoomConfig {
                api_base_url: "https://api.zoom.us/v2".to_string(),
                token_url: "https://zoom.us/oauth/token".to_string(),
                timeout_secs: 10,
                token_refresh_margin_secs: 300,
                list_page_size: 100,
                max_list_pages: 10,
                detail_concurrency: 5,
                accounts: Vec::new(),
            },
            schedule: ScheduleConfig {
                timezone: "Asia/Tokyo".to_string(),
                utc_offset_minutes: 9 * 60,
                default_start_time: "09:00".to_string(),
                default_duration_minutes: MeetingDuration::DEFAULT.minutes(),
                list_days: 7,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides)?;
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(slack) = patch.slack {
            if let Some(signing_secret) = slack.signing_secret {
                self.slack.signing_secret = secret_value(signing_secret);
            }
            if let Some(bot_token) = slack.bot_token {
                self.slack.bot_token = secret_value(bot_token);
            }
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
            if let Some(command) = slack.command {
                self.slack.command = command;
            }
        }

        if let Some(zoom) = patch.zoom {
            if let Some(api_base_url) = zoom.api_base_url {
                self.zoom.api_base_url = api_base_url;
            }
            if let Some(token_url) = zoom.token_url {
                self.zoom.token_url = token_url;
            }
            if let Some(timeout_secs) = zoom.timeout_secs {
                self.zoom.timeout_secs = timeout_secs;
            }
            if let Some(margin) = zoom.token_refresh_margin_secs {
                self.zoom.token_refresh_margin_secs = margin;
            }
            if let Some(list_page_size) = zoom.list_page_size {
                self.zoom.list_page_size = list_page_size;
            }
            if let Some(max_list_pages) = zoom.max_list_pages {
                self.zoom.max_list_pages = max_list_pages;
            }
            if let Some(detail_concurrency) = zoom.detail_concurrency {
                self.zoom.detail_concurrency = detail_concurrency;
            }
            if let Some(accounts) = zoom.accounts {
                self.zoom.accounts = validate_accounts(accounts)?;
            }
        }

        if let Some(schedule) = patch.schedule {
            if let Some(timezone) = schedule.timezone {
                self.schedule.timezone = timezone;
            }
            if let Some(utc_offset_minutes) = schedule.utc_offset_minutes {
                self.schedule.utc_offset_minutes = utc_offset_minutes;
            }
            if let Some(default_start_time) = schedule.default_start_time {
                self.schedule.default_start_time = default_start_time;
            }
            if let Some(default_duration_minutes) = schedule.default_duration_minutes {
                self.schedule.default_duration_minutes = default_duration_minutes;
            }
            if let Some(list_days) = schedule.list_days {
                self.schedule.list_days = list_days;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let signing_secret =
            read_env("MEETBOT_SLACK_SIGNING_SECRET").or_else(|| read_env("SLACK_SIGNING_SECRET"));
        if let Some(value) = signing_secret {
            self.slack.signing_secret = secret_value(value);
        }
        let bot_token = read_env("MEETBOT_SLACK_BOT_TOKEN").or_else(|| read_env("SLACK_BOT_TOKEN"));
        if let Some(value) = bot_token {
            self.slack.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("MEETBOT_SLACK_API_BASE_URL") {
            self.slack.api_base_url = value;
        }
        if let Some(value) = read_env("MEETBOT_SLACK_COMMAND") {
            self.slack.command = value;
        }

        if let Some(value) = read_env("MEETBOT_ZOOM_API_BASE_URL") {
            self.zoom.api_base_url = value;
        }
        if let Some(value) = read_env("MEETBOT_ZOOM_TOKEN_URL") {
            self.zoom.token_url = value;
        }
        if let Some(value) = read_env("MEETBOT_ZOOM_TIMEOUT_SECS") {
            self.zoom.timeout_secs = parse_u64("MEETBOT_ZOOM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("MEETBOT_ZOOM_TOKEN_REFRESH_MARGIN_SECS") {
            self.zoom.token_refresh_margin_secs =
                parse_u64("MEETBOT_ZOOM_TOKEN_REFRESH_MARGIN_SECS", &value)?;
        }
        if let Some(value) = read_env("MEETBOT_ZOOM_LIST_PAGE_SIZE") {
            self.zoom.list_page_size = parse_u32("MEETBOT_ZOOM_LIST_PAGE_SIZE", &value)?;
        }
        if let Some(value) = read_env("MEETBOT_ZOOM_MAX_LIST_PAGES") {
            self.zoom.max_list_pages = parse_u32("MEETBOT_ZOOM_MAX_LIST_PAGES", &value)?;
        }
        if let Some(value) = read_env("MEETBOT_ZOOM_DETAIL_CONCURRENCY") {
            self.zoom.detail_concurrency =
                parse_u32("MEETBOT_ZOOM_DETAIL_CONCURRENCY", &value)? as usize;
        }

        let accounts_json = read_env("MEETBOT_ZOOM_ACCOUNTS").or_else(|| read_env("ZOOM_ACCOUNTS"));
        if let Some(value) = accounts_json {
            self.zoom.accounts = parse_accounts_json(&value)?;
        } else if let Some(account) = legacy_account_from_env()? {
            self.zoom.accounts = vec![account];
        }

        if let Some(value) = read_env("MEETBOT_SCHEDULE_TIMEZONE") {
            self.schedule.timezone = value;
        }
        if let Some(value) = read_env("MEETBOT_SCHEDULE_UTC_OFFSET_MINUTES") {
            self.schedule.utc_offset_minutes =
                parse_i32("MEETBOT_SCHEDULE_UTC_OFFSET_MINUTES", &value)?;
        }
        if let Some(value) = read_env("MEETBOT_SCHEDULE_DEFAULT_START_TIME") {
            self.schedule.default_start_time = value;
        }
        if let Some(value) = read_env("MEETBOT_SCHEDULE_DEFAULT_DURATION_MINUTES") {
            self.schedule.default_duration_minutes =
                parse_u32("MEETBOT_SCHEDULE_DEFAULT_DURATION_MINUTES", &value)?;
        }
        if let Some(value) = read_env("MEETBOT_SCHEDULE_LIST_DAYS") {
            self.schedule.list_days = parse_u32("MEETBOT_SCHEDULE_LIST_DAYS", &value)?;
        }

        if let Some(value) = read_env("MEETBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("MEETBOT_SERVER_PORT") {
            self.server.port = parse_u16("MEETBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("MEETBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("MEETBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("MEETBOT_LOGGING_LEVEL").or_else(|| read_env("MEETBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MEETBOT_LOGGING_FORMAT").or_else(|| read_env("MEETBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(signing_secret) = overrides.slack_signing_secret {
            self.slack.signing_secret = secret_value(signing_secret);
        }
        if let Some(bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(bot_token);
        }
        if let Some(api_base_url) = overrides.slack_api_base_url {
            self.slack.api_base_url = api_base_url;
        }
        if let Some(api_base_url) = overrides.zoom_api_base_url {
            self.zoom.api_base_url = api_base_url;
        }
        if let Some(token_url) = overrides.zoom_token_url {
            self.zoom.token_url = token_url;
        }
        if let Some(accounts_json) = overrides.zoom_accounts_json {
            self.zoom.accounts = parse_accounts_json(&accounts_json)?;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_zoom(&self.zoom)?;
        validate_schedule(&self.schedule)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn legacy_account_from_env() -> Result<Option<ZoomAccount>, ConfigError> {
    let account_id = read_env("ZOOM_ACCOUNT_ID");
    let client_id = read_env("ZOOM_CLIENT_ID");
    let client_secret = read_env("ZOOM_CLIENT_SECRET");

    match (account_id, client_id, client_secret) {
        (None, None, None) => Ok(None),
        (Some(account_id), Some(client_id), Some(client_secret)) => {
            Ok(Some(legacy_account(account_id, client_id, client_secret)))
        }
        (account_id, client_id, client_secret) => {
            let missing = [
                ("ZOOM_ACCOUNT_ID", account_id.is_none()),
                ("ZOOM_CLIENT_ID", client_id.is_none()),
                ("ZOOM_CLIENT_SECRET", client_secret.is_none()),
            ]
            .into_iter()
            .filter_map(|(key, missing)| missing.then_some(key))
            .collect::<Vec<_>>()
            .join(", ");
            Err(ConfigError::Validation(format!(
                "legacy Zoom credentials are incomplete; missing {missing}"
            )))
        }
    }
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    if slack.signing_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "slack.signing_secret is required. Get it from https://api.slack.com/apps > Your App > Basic Information > Signing Secret".to_string(),
        ));
    }

    let bot_token = slack.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required. Get it from https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token".to_string()
        ));
    }
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used an app-level token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    validate_http_url("slack.api_base_url", &slack.api_base_url)?;

    if !slack.command.starts_with('/') || slack.command.len() < 2 {
        return Err(ConfigError::Validation(
            "slack.command must be a slash command such as `/meeting`".to_string(),
        ));
    }

    Ok(())
}

fn validate_zoom(zoom: &ZoomConfig) -> Result<(), ConfigError> {
    validate_http_url("zoom.api_base_url", &zoom.api_base_url)?;
    validate_http_url("zoom.token_url", &zoom.token_url)?;

    if zoom.timeout_secs == 0 || zoom.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "zoom.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if zoom.list_page_size == 0 || zoom.list_page_size > 300 {
        return Err(ConfigError::Validation(
            "zoom.list_page_size must be in range 1..=300".to_string(),
        ));
    }
    if zoom.max_list_pages == 0 {
        return Err(ConfigError::Validation(
            "zoom.max_list_pages must be greater than zero".to_string(),
        ));
    }
    if zoom.detail_concurrency == 0 {
        return Err(ConfigError::Validation(
            "zoom.detail_concurrency must be greater than zero".to_string(),
        ));
    }
    if zoom.accounts.is_empty() {
        return Err(ConfigError::Validation(
            "zoom.accounts requires at least one account. Set ZOOM_ACCOUNTS, or ZOOM_ACCOUNT_ID / ZOOM_CLIENT_ID / ZOOM_CLIENT_SECRET".to_string(),
        ));
    }

    Ok(())
}

fn validate_schedule(schedule: &ScheduleConfig) -> Result<(), ConfigError> {
    if schedule.timezone.trim().is_empty() {
        return Err(ConfigError::Validation("schedule.timezone must not be empty".to_string()));
    }
    if !(-12 * 60..=14 * 60).contains(&schedule.utc_offset_minutes) {
        return Err(ConfigError::Validation(
            "schedule.utc_offset_minutes must be in range -720..=840".to_string(),
        ));
    }
    if NaiveTime::parse_from_str(&schedule.default_start_time, "%H:%M").is_err() {
        return Err(ConfigError::Validation(
            "schedule.default_start_time must be an HH:MM time".to_string(),
        ));
    }
    if !MeetingDuration::CREATE_CHOICES.contains(&schedule.default_duration_minutes) {
        return Err(ConfigError::Validation(format!(
            "schedule.default_duration_minutes must be one of {:?}",
            MeetingDuration::CREATE_CHOICES
        )));
    }
    if schedule.list_days == 0 || schedule.list_days > 31 {
        return Err(ConfigError::Validation(
            "schedule.list_days must be in range 1..=31".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i32(key: &str, value: &str) -> Result<i32, ConfigError> {
    value.parse::<i32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    zoom: Option<ZoomPatch>,
    schedule: Option<SchedulePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    signing_secret: Option<String>,
    bot_token: Option<String>,
    api_base_url: Option<String>,
    command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ZoomPatch {
    api_base_url: Option<String>,
    token_url: Option<String>,
    timeout_secs: Option<u64>,
    token_refresh_margin_secs: Option<u64>,
    list_page_size: Option<u32>,
    max_list_pages: Option<u32>,
    detail_concurrency: Option<usize>,
    accounts: Option<Vec<RawAccount>>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulePatch {
    timezone: Option<String>,
    utc_offset_minutes: Option<i32>,
    default_start_time: Option<String>,
    default_duration_minutes: Option<u32>,
    list_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
