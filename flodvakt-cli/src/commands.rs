use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use flodvakt_capture::{DeviceInventory, PcapInventory, PcapSourceFactory};
use flodvakt_config::FlodvaktConfig;
use flodvakt_core::ShutdownSignal;
use flodvakt_engine::run_agent;
use flodvakt_telemetry::MetricsRecorder;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the capture agent
    Run(RunArgs),
    /// List capturable interfaces and their addresses
    Interfaces,
    /// Load, validate and print the effective configuration
    CheckConfig(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Configuration file; defaults to config/flodvakt.yaml plus environment
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

fn load_config(args: &RunArgs) -> anyhow::Result<FlodvaktConfig> {
    let config = match &args.config {
        Some(path) => FlodvaktConfig::load_from_path(path)?,
        None => FlodvaktConfig::load()?,
    };
    Ok(config)
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_agent_command(args).await,
        Commands::Interfaces => list_interfaces(),
        Commands::CheckConfig(args) => {
            let config = load_config(&args)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_agent_command(args: RunArgs) -> anyhow::Result<()> {
    // Invalid configuration is startup-fatal: bail before touching pcap.
    let config = load_config(&args)?;
    let metrics = MetricsRecorder::new();
    let shutdown = ShutdownSignal::new();

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal.trip();
        }
    });

    let result = run_agent(
        config,
        Arc::new(PcapInventory),
        Arc::new(PcapSourceFactory::default()),
        shutdown,
        metrics.clone(),
    )
    .await;

    if let Ok(rendered) = metrics.gather() {
        info!(metrics = %rendered, "final metrics");
    }
    if let Err(e) = &result {
        error!(error = %e, "agent terminated with error");
    }
    result.map_err(Into::into)
}

fn list_interfaces() -> anyhow::Result<()> {
    let devices = PcapInventory.devices()?;
    if devices.is_empty() {
        println!("no capturable interfaces found");
        return Ok(());
    }
    for device in devices {
        let addresses = device
            .ipv4_addresses
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("{:<16} {:<40} [{}]", device.name, device.description, addresses);
    }
    Ok(())
}
