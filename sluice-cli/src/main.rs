//! Sluice CLI
//!
//! Command-line interface for importing and exporting pipelines.

mod commands;
mod config;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Sluice pipeline import CLI", long_about = None)]
struct Cli {
    /// Sluice API URL
    #[arg(long, env = "SLUICE_URL", default_value = "http://localhost:8080")]
    url: String,

    /// API token
    #[arg(long, env = "SLUICE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Timeout in seconds for reading remote pipeline sources
    #[arg(long, env = "SLUICE_FETCH_TIMEOUT", default_value = "10")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        url: cli.url,
        token: cli.token,
        fetch_timeout: Duration::from_secs(cli.timeout),
    };

    handle_command(cli.command, &config).await
}
