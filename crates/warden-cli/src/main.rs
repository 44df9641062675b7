//! Warden CLI - Home Assistant health digest
//!
//! Main entry point for the `warden` binary.

mod app;
mod commands;

use anyhow::Result;
use app::InitOptions;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use warden_core::LogLevel;

/// Publishes a daily health summary of a Home Assistant instance
#[derive(Parser, Debug)]
#[command(name = "warden", version, about)]
struct Cli {
    /// Configuration file (default: ~/.warden/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level and mirror logs to stdout
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level: error, warn, info, debug or trace (`RUST_LOG` still wins)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Publish one report now and exit
    Run,
    /// Run in the foreground: startup report, daily report and trigger buttons
    Daemon,
    /// Show configuration and hub connectivity
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = match cli.command {
        Command::Daemon => InitOptions::daemon(),
        Command::Run | Command::Status => InitOptions::command(),
    }
    .verbose(cli.verbose)
    .log_level(cli.log_level);

    let ctx = app::initialize(cli.config.as_deref(), options)?;

    match cli.command {
        Command::Run => commands::run::run(&ctx).await,
        Command::Daemon => commands::daemon::run(&ctx).await,
        Command::Status => commands::status::run(&ctx).await,
    }
}
