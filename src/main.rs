//! wrtpilot - safety and execution core for router commands
//!
//! CLI entry point: validates and runs plan files.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so streamed command output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wrtpilot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();
    debug!("Starting wrtpilot v{}", env!("CARGO_PKG_VERSION"));

    cli::run(cli).await
}
