//! Apps Monitor Daemon - Self-healing app status reconciliation
//!
//! The daemon periodically:
//! - Discovers the instances of a chat server cluster
//! - Compares every installed app's status across instances
//! - Re-enables apps that drifted and alerts an operator room

use std::path::PathBuf;

use appsmon_daemon::{Daemon, DaemonConfig, DaemonResult};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Apps Monitor Daemon CLI
#[derive(Parser)]
#[command(name = "appsmond")]
#[command(about = "Apps Monitor - Keeps app statuses consistent across a chat server cluster", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "APPS_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "LOG_JSON")]
    json: bool,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = DaemonConfig::load(cli.config.as_deref())?;

    println!(
        r#"
  Apps Monitor
  Version: {}
  Server: {}
  Discovery: {}
  Interval: {} ms
"#,
        env!("CARGO_PKG_VERSION"),
        config.server_url,
        config.discovery.name(),
        config.monitor.interval_ms()
    );

    let daemon = Daemon::new(config)?;

    if cli.once {
        let report = daemon.run_once().await?;
        tracing::info!(
            fixed_apps = report.result().fixed_apps,
            fixed_conflicts = report.result().fixed_conflicts,
            "Single pass finished"
        );
        return Ok(());
    }

    daemon.run().await
}
