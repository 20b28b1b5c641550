use meetbot_core::config::{AppConfig, ConfigError, LoadOptions};
use meetbot_core::schedule::Schedule;
use meetbot_zoom::HttpZoomClient;
use secrecy::ExposeSecret;
use serde::Serialize;

use super::{redact_token, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool, probe_zoom: bool) -> CommandResult {
    let report = build_report(AppConfig::load(options), probe_zoom);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        return match serde_json::to_string_pretty(&report) {
            Ok(output) => CommandResult::output(exit_code, output),
            Err(error) => CommandResult::failure("doctor", "serialization", error.to_string(), 1),
        };
    }

    CommandResult::output(exit_code, render_human(&report))
}

fn build_report(loaded: Result<AppConfig, ConfigError>, probe_zoom: bool) -> DoctorReport {
    let mut checks = Vec::new();

    match loaded {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_slack_credentials(&config));
            checks.push(check_zoom_accounts(&config));
            checks.push(check_schedule(&config));
            checks.push(if probe_zoom {
                check_zoom_tokens(&config)
            } else {
                DoctorCheck::skipped("zoom_token", "pass --probe-zoom to request OAuth tokens")
            });
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            for name in ["slack_credentials", "zoom_accounts", "schedule", "zoom_token"] {
                checks.push(DoctorCheck::skipped(
                    name,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_credentials(config: &AppConfig) -> DoctorCheck {
    DoctorCheck::pass(
        "slack_credentials",
        format!(
            "signing secret present, bot token {} accepted for command `{}`",
            redact_token(config.slack.bot_token.expose_secret()),
            config.slack.command
        ),
    )
}

fn check_zoom_accounts(config: &AppConfig) -> DoctorCheck {
    let ids: Vec<&str> = config.zoom.accounts.iter().map(|account| account.id.as_str()).collect();
    DoctorCheck::pass(
        "zoom_accounts",
        format!("{} account(s) configured: {}", ids.len(), ids.join(", ")),
    )
}

fn check_schedule(config: &AppConfig) -> DoctorCheck {
    match Schedule::from_config(&config.schedule) {
        Ok(_) => DoctorCheck::pass(
            "schedule",
            format!(
                "{} (UTC{:+}m), default start {}, {} day listing window",
                config.schedule.timezone,
                config.schedule.utc_offset_minutes,
                config.schedule.default_start_time,
                config.schedule.list_days
            ),
        ),
        Err(error) => DoctorCheck::fail("schedule", error.to_string()),
    }
}

fn check_zoom_tokens(config: &AppConfig) -> DoctorCheck {
    let client = match HttpZoomClient::from_config(&config.zoom) {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck::fail("zoom_token", format!("failed to build zoom client: {error}"))
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::fail(
                "zoom_token",
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let failures: Vec<String> = runtime.block_on(async {
        let mut failures = Vec::new();
        for account in &config.zoom.accounts {
            if let Err(error) = client.auth().access_token(account).await {
                failures.push(format!("{}: {error}", account.id));
            }
        }
        failures
    });

    if failures.is_empty() {
        DoctorCheck::pass(
            "zoom_token",
            format!("issued tokens for {} account(s)", config.zoom.accounts.len()),
        )
    } else {
        DoctorCheck::fail("zoom_token", failures.join("; "))
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
