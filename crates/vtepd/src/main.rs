//! vtepd entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vtepd::{DaemonConfig, VtepDaemon};

/// VTEP reconciliation daemon
#[derive(Parser, Debug)]
#[command(name = "vtepd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the daemon configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device endpoint, host:port; overrides the config file
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Path to the desired-state file; overrides the config file
    #[arg(short, long)]
    desired_state: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = match &args.config {
        Some(path) => DaemonConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(desired) = args.desired_state {
        config.desired_state = Some(desired.display().to_string());
    }

    info!("starting vtepd");
    VtepDaemon::new(config).run().await?;
    info!("vtepd exiting");
    Ok(())
}
