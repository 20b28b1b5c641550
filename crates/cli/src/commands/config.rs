use std::env;
use std::fs;
use std::path::Path;

use meetbot_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use super::{redact_token, CommandResult};

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::output(1, format!("config validation failed: {error}"))
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let output = render(&config, config_file_doc.as_ref(), config_file_path.as_deref(), |key| {
        env::var_os(key).is_some()
    });
    CommandResult::output(0, output)
}

fn render(
    config: &AppConfig,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
    env_is_set: impl Fn(&str) -> bool,
) -> String {
    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];

    for field in fields(config) {
        let source =
            field_source(field.key, field.env_keys, &env_is_set, config_file_doc, config_file_path);
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let signing_secret = if config.slack.signing_secret.expose_secret().is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    };
    let account_ids: Vec<&str> =
        config.zoom.accounts.iter().map(|account| account.id.as_str()).collect();

    vec![
        Field::new(
            "slack.signing_secret",
            signing_secret,
            &["MEETBOT_SLACK_SIGNING_SECRET", "SLACK_SIGNING_SECRET"],
        ),
        Field::new(
            "slack.bot_token",
            redact_token(config.slack.bot_token.expose_secret()),
            &["MEETBOT_SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"],
        ),
        Field::new(
            "slack.api_base_url",
            config.slack.api_base_url.as_str(),
            &["MEETBOT_SLACK_API_BASE_URL"],
        ),
        Field::new("slack.command", config.slack.command.as_str(), &["MEETBOT_SLACK_COMMAND"]),
        Field::new(
            "zoom.api_base_url",
            config.zoom.api_base_url.as_str(),
            &["MEETBOT_ZOOM_API_BASE_URL"],
        ),
        Field::new("zoom.token_url", config.zoom.token_url.as_str(), &["MEETBOT_ZOOM_TOKEN_URL"]),
        Field::new(
            "zoom.timeout_secs",
            config.zoom.timeout_secs.to_string(),
            &["MEETBOT_ZOOM_TIMEOUT_SECS"],
        ),
        Field::new(
            "zoom.token_refresh_margin_secs",
            config.zoom.token_refresh_margin_secs.to_string(),
            &["MEETBOT_ZOOM_TOKEN_REFRESH_MARGIN_SECS"],
        ),
        Field::new(
            "zoom.list_page_size",
            config.zoom.list_page_size.to_string(),
            &["MEETBOT_ZOOM_LIST_PAGE_SIZE"],
        ),
        Field::new(
            "zoom.max_list_pages",
            config.zoom.max_list_pages.to_string(),
            &["MEETBOT_ZOOM_MAX_LIST_PAGES"],
        ),
        Field::new(
            "zoom.detail_concurrency",
            config.zoom.detail_concurrency.to_string(),
            &["MEETBOT_ZOOM_DETAIL_CONCURRENCY"],
        ),
        Field::new(
            "zoom.accounts",
            format!("{} account(s) [{}]", account_ids.len(), account_ids.join(", ")),
            &["MEETBOT_ZOOM_ACCOUNTS", "ZOOM_ACCOUNTS", "ZOOM_ACCOUNT_ID"],
        ),
        Field::new(
            "schedule.timezone",
            config.schedule.timezone.as_str(),
            &["MEETBOT_SCHEDULE_TIMEZONE"],
        ),
        Field::new(
            "schedule.utc_offset_minutes",
            config.schedule.utc_offset_minutes.to_string(),
            &["MEETBOT_SCHEDULE_UTC_OFFSET_MINUTES"],
        ),
        Field::new(
            "schedule.default_start_time",
            config.schedule.default_start_time.as_str(),
            &["MEETBOT_SCHEDULE_DEFAULT_START_TIME"],
        ),
        Field::new(
            "schedule.default_duration_minutes",
            config.schedule.default_duration_minutes.to_string(),
            &["MEETBOT_SCHEDULE_DEFAULT_DURATION_MINUTES"],
        ),
        Field::new(
            "schedule.list_days",
            config.schedule.list_days.to_string(),
            &["MEETBOT_SCHEDULE_LIST_DAYS"],
        ),
        Field::new(
            "server.bind_address",
            config.server.bind_address.as_str(),
            &["MEETBOT_SERVER_BIND_ADDRESS"],
        ),
        Field::new("server.port", config.server.port.to_string(), &["MEETBOT_SERVER_PORT"]),
        Field::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["MEETBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Field::new(
            "logging.level",
            config.logging.level.as_str(),
            &["MEETBOT_LOGGING_LEVEL", "MEETBOT_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["MEETBOT_LOGGING_FORMAT", "MEETBOT_LOG_FORMAT"],
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    env_is_set: impl Fn(&str) -> bool,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env_is_set(key)) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
