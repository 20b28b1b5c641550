use meetbot_core::accounts::ZoomAccount;
use meetbot_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct AccountRow {
    id: String,
    name: String,
    account_id: String,
    client_id: String,
    client_secret: &'static str,
    default: bool,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    match AppConfig::load(options) {
        Ok(config) => CommandResult::output(0, render(&config.zoom.accounts, json_output)),
        Err(error) => CommandResult::failure("accounts", "config", error.to_string(), 1),
    }
}

fn rows(accounts: &[ZoomAccount]) -> Vec<AccountRow> {
    accounts
        .iter()
        .enumerate()
        .map(|(index, account)| AccountRow {
            id: account.id.clone(),
            name: account.name.clone(),
            account_id: account.account_id.clone(),
            client_id: account.client_id.clone(),
            client_secret: "<redacted>",
            default: index == 0,
        })
        .collect()
}

fn render(accounts: &[ZoomAccount], json_output: bool) -> String {
    let rows = rows(accounts);

    if json_output {
        return serde_json::to_string_pretty(&rows).unwrap_or_else(|error| {
            CommandResult::failure("accounts", "serialization", error.to_string(), 1).output
        });
    }

    let mut lines = vec![format!("{} zoom account(s) configured:", rows.len())];
    for row in &rows {
        let marker = if row.default { " (default)" } else { "" };
        lines.push(format!(
            "- {}{marker}: {} [account_id={}, client_id={}, client_secret={}]",
            row.id, row.name, row.account_id, row.client_id, row.client_secret
        ));
    }
    lines.join("\n")
}
