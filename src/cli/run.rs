//! `wrtpilot run` - validate, execute and report a plan

use super::fixes::FixTable;
use crate::config::AppConfig;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wrtpilot_core::{AutoRetry, PolicyEngine, RetryReport};
use wrtpilot_exec::{Executor, Results, Sandbox, SandboxRunner, WriterSink};

/// Arguments for `wrtpilot run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Plan JSON file (`-` for stdin)
    pub plan: PathBuf,

    /// Execute through the sandbox (scratch dir, process group, limits)
    #[arg(long)]
    pub sandbox: bool,

    /// Do not stream command output while running
    #[arg(long, short)]
    pub quiet: bool,

    /// Print the full results as JSON
    #[arg(long)]
    pub json: bool,

    /// Fix table used for auto-retry (JSON map of command line to plan)
    #[arg(long, value_name = "FILE")]
    pub fixes: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunReport<'a> {
    summary: Option<&'a str>,
    warnings: &'a [String],
    results: &'a Results,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry: Option<&'a RetryReport>,
}

/// Execute the plan, exiting non-zero if anything is still failing
pub async fn run(config: &AppConfig, args: RunArgs) -> Result<ExitCode> {
    let mut plan = super::read_plan(&args.plan)?;
    plan.truncate_commands(config.retry.max_commands);

    let policy = Arc::new(PolicyEngine::from_config(&config.policy));
    if let Err(violation) = policy.validate_plan(&plan) {
        eprintln!("rejected: {}", violation);
        return Ok(ExitCode::FAILURE);
    }

    if !args.json {
        if let Some(summary) = &plan.summary {
            println!("{}", summary);
        }
        for warning in &plan.warnings {
            println!("warning: {}", warning);
        }
    }

    let executor = if args.sandbox {
        let sandbox = Sandbox::new(config.sandbox.clone());
        Executor::with_runner(config.executor.clone(), Arc::new(SandboxRunner::new(sandbox)))
    } else {
        Executor::new(config.executor.clone())
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling execution");
            on_interrupt.cancel();
        }
    });

    info!(commands = plan.len(), sandbox = args.sandbox, "Running plan");
    let mut results = if args.quiet || args.json {
        executor.run_plan(&cancel, &plan).await
    } else {
        let mut sink = WriterSink::new(std::io::stdout());
        executor.run_plan_streaming(&cancel, &plan, &mut sink).await
    };

    let retry = match &args.fixes {
        Some(path) if config.retry.is_active() => {
            let table = FixTable::load(path)?;
            info!(entries = table.len(), "Loaded fix table");
            let retry = AutoRetry::new(
                executor.clone(),
                policy.clone(),
                Arc::new(table),
                config.retry.clone(),
            );
            Some(retry.run(&cancel, &mut results).await)
        }
        Some(_) => {
            warn!("Fix table given but retry is disabled in configuration");
            None
        }
        None => None,
    };

    if args.json {
        let report = RunReport {
            summary: plan.summary.as_deref(),
            warnings: &plan.warnings,
            results: &results,
            retry: retry.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&results, retry.as_ref());
    }

    Ok(if results.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(results: &Results, retry: Option<&RetryReport>) {
    println!();
    for item in results.items() {
        let elapsed = item.elapsed.as_millis();
        match &item.error {
            None => println!("[ok]   {} ({} ms)", item.command_line(), elapsed),
            Some(error) => println!("[fail] {}: {}", item.command_line(), error),
        }
        if item.truncated {
            println!("       output truncated");
        }
    }
    for fix in results.fixes() {
        let target = fix.fix_for.map(|i| i + 1).unwrap_or_default();
        let status = if fix.is_success() { "ok" } else { "fail" };
        println!("[fix {}] {} ({})", target, fix.command_line(), status);
    }
    if let Some(retry) = retry {
        println!(
            "retry: {} attempt(s), {} fix(es) applied, {} rejected by policy",
            retry.attempts, retry.fixes_applied, retry.fixes_rejected
        );
    }
    println!(
        "{} of {} command(s) failed",
        results.failed(),
        results.items().len()
    );
}
