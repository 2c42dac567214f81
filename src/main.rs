//! HetrixTools sensor daemon.
//!
//! Loads the platform config, creates one sensor per monitor and keeps them
//! refreshed at the scan interval. With `--once` it polls a single cycle and
//! prints the sensor snapshots as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use hetrixtools_sensor::{host, PlatformConfig, SensorSnapshot};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML config (defaults to <config dir>/hetrixtools/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Poll every monitor once, print the result and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hetrixtools_sensor=info".into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => PlatformConfig::default_path().context("Cannot determine config directory")?,
    };
    let config = PlatformConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!(
        config = %config_path.display(),
        monitors = config.monitors.len(),
        "HetrixTools sensor v{}",
        env!("CARGO_PKG_VERSION")
    );

    let client = reqwest::Client::builder()
        .user_agent(concat!("hetrixtools-sensor/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let mut sensors = host::setup_platform(&config, client).await;

    if args.once {
        let snapshots: Vec<SensorSnapshot> = sensors.iter().map(|s| s.snapshot()).collect();
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    let interval = config.scan_interval();
    tokio::select! {
        _ = host::run(&mut sensors, interval) => {}
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
        }
    }

    Ok(())
}
