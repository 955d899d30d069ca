//! `wrtpilot check` - validate a plan without running it

use crate::config::AppConfig;
use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;
use wrtpilot_core::PolicyEngine;

/// Validate the plan at `path`, exiting non-zero on rejection
pub fn run(config: &AppConfig, path: &Path) -> Result<ExitCode> {
    let mut plan = super::read_plan(path)?;
    plan.truncate_commands(config.retry.max_commands);
    for warning in &plan.warnings {
        println!("warning: {}", warning);
    }

    let policy = PolicyEngine::from_config(&config.policy);
    match policy.validate_plan(&plan) {
        Ok(()) => {
            println!("ok: {} command(s) permitted", plan.len());
            for command in &plan.commands {
                let root = if command.needs_root { " (root)" } else { "" };
                println!("  {}{}", command.render(), root);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(violation) => {
            eprintln!("rejected: {}", violation);
            Ok(ExitCode::FAILURE)
        }
    }
}
