pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use meetbot_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "meetbot",
    about = "Meetbot operator CLI",
    long_about = "Inspect meetbot configuration, configured Zoom accounts, and deployment readiness.",
    after_help = "Examples:\n  meetbot doctor --json\n  meetbot doctor --probe-zoom\n  meetbot accounts\n  meetbot config --config deploy/meetbot.toml"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Read this TOML file instead of meetbot.toml")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "List configured Zoom accounts with credentials redacted")]
    Accounts {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Validate config, Slack credentials, schedule, and Zoom account readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(long, help = "Request an OAuth token for every Zoom account")]
        probe_zoom: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            ..LoadOptions::default()
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let result = match cli.command {
        Command::Config => commands::config::run(options),
        Command::Accounts { json } => commands::accounts::run(options, json),
        Command::Doctor { json, probe_zoom } => commands::doctor::run(options, json, probe_zoom),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
