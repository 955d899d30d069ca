//! CLI module for wrtpilot
//!
//! Provides commands over a plan file:
//! - `check`: structural and policy validation only
//! - `run`: validate, execute, optionally auto-retry, then report

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use wrtpilot_exec::Plan;

pub mod check;
pub mod fixes;
pub mod run;

/// wrtpilot command-safety core
#[derive(Parser, Debug)]
#[command(name = "wrtpilot")]
#[command(about = "Validate and run LLM-planned router commands")]
#[command(version)]
pub struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a plan against the command policy
    Check {
        /// Plan JSON file (`-` for stdin)
        plan: PathBuf,
    },
    /// Validate and execute a plan
    Run(run::RunArgs),
}

/// Run the CLI command
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = crate::config::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Check { plan } => check::run(&config, &plan),
        Commands::Run(args) => run::run(&config, args).await,
    }
}

/// Read a plan from a file, or stdin for `-`
pub fn read_plan(path: &Path) -> Result<Plan> {
    let input = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read plan from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?
    };
    Plan::from_json(&input).context("Invalid plan JSON")
}
