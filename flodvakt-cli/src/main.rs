//! ## flodvakt-cli
//! Flodvakt main entrypoint: the long-running capture agent plus small
//! operator commands for inspecting interfaces and configuration.
//!
//! All fatal conditions log a diagnostic and exit non-zero so a hosting
//! service manager can restart or alert.

use clap::Parser;
use flodvakt_telemetry::logging::EventLogger;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    EventLogger::init();
    let cli = Cli::parse();
    commands::run_command(cli).await
}
