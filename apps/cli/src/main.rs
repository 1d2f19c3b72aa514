mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;
use crate::config::Config;

const DEFAULT_LOG_FILTER: &str = "resumesync=info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `log` records from the library crates are bridged by the subscriber.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_filter(DEFAULT_LOG_FILTER))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?.with_identity(cli.identity.clone());
    commands::run(&config, cli.command).await
}
