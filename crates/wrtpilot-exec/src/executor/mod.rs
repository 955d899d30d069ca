//! Executor - runs planned commands without a shell
//!
//! This module provides the normal execution path used by every caller:
//! - Per-command timeout derived from configuration
//! - `PATH`-only child environment
//! - Elevation prefix for `needs_root` commands
//! - Bounded combined-output capture, optionally streamed line by line
//!
//! Policy is not applied here; callers validate plans before handing them in.
//! A failing command never stops the rest of the plan.

mod capture;
mod config;
mod process;
mod runner;

#[cfg(test)]
mod tests;

pub use config::{ExecutorConfig, DEFAULT_TIMEOUT_SECS, FALLBACK_PATH};
pub use process::ProcessRunner;
pub use runner::{CommandRunner, RunOutput, RunRequest};

pub(crate) use capture::collect_output;
pub(crate) use process::{base_command, spawn_error};

use crate::error::ExecError;
use crate::output::OutputSink;
use crate::plan::{Plan, PlannedCommand};
use crate::result::{CommandResult, Results};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Runs commands and plans through a [`CommandRunner`]
#[derive(Clone)]
pub struct Executor {
    config: ExecutorConfig,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Create an executor that spawns processes directly
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    /// Create an executor with a custom runner (sandbox, tests)
    #[must_use]
    pub fn with_runner(config: ExecutorConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Argv as it will be run, with the elevation prefix for `needs_root`
    #[must_use]
    pub fn prepare_argv(&self, command: &PlannedCommand) -> Vec<String> {
        if !command.needs_root {
            return command.argv.clone();
        }
        let mut argv = self.config.elevation_tokens();
        argv.extend(command.argv.iter().cloned());
        argv
    }

    /// Run one command, capturing its output
    pub async fn run_command(
        &self,
        cancel: &CancellationToken,
        command: &PlannedCommand,
    ) -> CommandResult {
        self.run_at(cancel, 0, command, None).await
    }

    /// Run one command, streaming its output to `sink` as well
    pub async fn run_command_streaming(
        &self,
        cancel: &CancellationToken,
        command: &PlannedCommand,
        sink: &mut dyn OutputSink,
    ) -> CommandResult {
        self.run_at(cancel, 0, command, Some(sink)).await
    }

    /// Run every command of a plan in order
    #[instrument(skip_all, fields(commands = plan.len()))]
    pub async fn run_plan(&self, cancel: &CancellationToken, plan: &Plan) -> Results {
        let mut results = Results::new();
        for (index, command) in plan.commands.iter().enumerate() {
            results.push(self.run_at(cancel, index, command, None).await);
        }
        log_summary(&results);
        results
    }

    /// Run every command of a plan in order, streaming output to `sink`
    #[instrument(skip_all, fields(commands = plan.len()))]
    pub async fn run_plan_streaming(
        &self,
        cancel: &CancellationToken,
        plan: &Plan,
        sink: &mut dyn OutputSink,
    ) -> Results {
        let mut results = Results::new();
        for (index, command) in plan.commands.iter().enumerate() {
            results.push(self.run_at(cancel, index, command, Some(&mut *sink)).await);
        }
        log_summary(&results);
        results
    }

    async fn run_at(
        &self,
        cancel: &CancellationToken,
        index: usize,
        command: &PlannedCommand,
        sink: Option<&mut dyn OutputSink>,
    ) -> CommandResult {
        if command.argv.is_empty() {
            warn!(index, "Skipping empty command");
            return CommandResult::rejected(index, Vec::new(), ExecError::EmptyCommand);
        }

        let argv = self.prepare_argv(command);
        if cancel.is_cancelled() {
            debug!(index, "Cancelled before start");
            return CommandResult::rejected(index, argv, ExecError::Cancelled);
        }

        let line = command.render();
        debug!(index, command = %line, needs_root = command.needs_root, "Executing command");

        let path = self.config.child_path();
        let request = RunRequest {
            argv: &argv,
            path: &path,
            timeout: self.config.timeout(),
            max_output_bytes: self.config.max_output_bytes,
            cancel,
        };
        let outcome = self.runner.run(request, sink).await;

        match &outcome.error {
            None => debug!(
                index,
                command = %line,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Command succeeded"
            ),
            Some(error) => warn!(
                index,
                command = %line,
                error = %error,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Command failed"
            ),
        }
        if outcome.truncated {
            info!(index, limit = self.config.max_output_bytes, "Output truncated");
        }

        CommandResult {
            index,
            argv,
            output: outcome.output,
            error: outcome.error,
            elapsed: outcome.elapsed,
            truncated: outcome.truncated,
            started_at: outcome.started_at,
            fix_for: None,
        }
    }
}

fn log_summary(results: &Results) {
    info!(
        total = results.items().len(),
        failed = results.failed(),
        "Plan execution finished"
    );
}
