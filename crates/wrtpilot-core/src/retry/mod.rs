//! Auto-retry - ask for a fix, validate it, run it, merge it back
//!
//! One attempt walks a snapshot of the currently failing results. For each
//! one the [`FixPlanner`] is asked for a corrective plan; that plan goes
//! through the same [`PolicyEngine`] as any original plan and only then
//! through the [`Executor`]. A fix that fully succeeds clears the original
//! failure. A fix that fails replaces the original output and error so the
//! next attempt reasons about the latest failure.


use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::policy::PolicyEngine;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use wrtpilot_exec::{Executor, Plan, Results};

/// Produces corrective plans for failed commands (usually an LLM client)
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FixPlanner: Send + Sync {
    /// Propose a plan fixing `command`, which failed with `output`.
    ///
    /// `attempt` starts at 1. An error or an empty plan means no fix is
    /// available this attempt.
    async fn generate_error_fix(&self, command: &str, output: &str, attempt: u32) -> Result<Plan>;
}

/// What an [`AutoRetry::run`] pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    /// Attempts started
    pub attempts: u32,
    /// Fix requests sent to the planner
    pub fixes_requested: usize,
    /// Fixes that ran and fully succeeded
    pub fixes_applied: usize,
    /// Fixes that ran and failed
    pub fixes_failed: usize,
    /// Fix plans refused by policy
    pub fixes_rejected: usize,
    /// Requests that produced no usable plan
    pub fixes_unavailable: usize,
    /// Failures left after the pass
    pub remaining_failures: usize,
}

/// Bounded fix loop over [`Results`]
#[derive(Clone)]
pub struct AutoRetry {
    executor: Executor,
    policy: Arc<PolicyEngine>,
    planner: Arc<dyn FixPlanner>,
    config: RetryConfig,
}

impl std::fmt::Debug for AutoRetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoRetry")
            .field("executor", &self.executor)
            .field("policy", &self.policy)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

enum FixOutcome {
    Applied,
    Failed,
    Rejected,
    Unavailable,
}

impl AutoRetry {
    /// Create an orchestrator
    #[must_use]
    pub fn new(
        executor: Executor,
        policy: Arc<PolicyEngine>,
        planner: Arc<dyn FixPlanner>,
        config: RetryConfig,
    ) -> Self {
        Self {
            executor,
            policy,
            planner,
            config,
        }
    }

    /// Retry failed results in place.
    ///
    /// Does nothing when retry is disabled, the ceiling is 0, or nothing
    /// failed. Stops early once no failures remain or `cancel` fires.
    #[instrument(skip_all, fields(failed = results.failed()))]
    pub async fn run(&self, cancel: &CancellationToken, results: &mut Results) -> RetryReport {
        let mut report = RetryReport::default();
        if !self.config.is_active() || results.is_success() {
            report.remaining_failures = results.failed();
            return report;
        }

        for attempt in 1..=self.config.max_retries {
            if results.is_success() || cancel.is_cancelled() {
                break;
            }
            report.attempts = attempt;
            let failing = results.failed_indices();
            info!(attempt, failing = failing.len(), "Starting retry attempt");

            for position in failing {
                if cancel.is_cancelled() {
                    break;
                }
                report.fixes_requested += 1;
                match self.retry_one(cancel, results, position, attempt).await {
                    FixOutcome::Applied => report.fixes_applied += 1,
                    FixOutcome::Failed => report.fixes_failed += 1,
                    FixOutcome::Rejected => report.fixes_rejected += 1,
                    FixOutcome::Unavailable => report.fixes_unavailable += 1,
                }
            }
        }

        report.remaining_failures = results.failed();
        info!(
            attempts = report.attempts,
            applied = report.fixes_applied,
            remaining = report.remaining_failures,
            "Auto-retry finished"
        );
        report
    }

    async fn retry_one(
        &self,
        cancel: &CancellationToken,
        results: &mut Results,
        position: usize,
        attempt: u32,
    ) -> FixOutcome {
        let Some(item) = results.items().get(position) else {
            return FixOutcome::Unavailable;
        };
        let command = item.command_line();
        let output = if item.output.trim().is_empty() {
            item.error.as_ref().map(ToString::to_string).unwrap_or_default()
        } else {
            item.output.clone()
        };

        let mut plan = match self.request_fix(cancel, &command, &output, attempt).await {
            Ok(plan) if !plan.is_empty() => plan,
            Ok(_) => {
                debug!(command = %command, attempt, "Planner returned an empty fix");
                return FixOutcome::Unavailable;
            }
            Err(e) => {
                warn!(command = %command, attempt, error = %e, "Fix generation failed");
                return FixOutcome::Unavailable;
            }
        };

        plan.truncate_commands(self.config.max_commands);
        if let Err(violation) = self.policy.validate_plan(&plan) {
            warn!(command = %command, attempt, %violation, "Fix rejected by policy");
            return FixOutcome::Rejected;
        }

        let fix = self.executor.run_plan(cancel, &plan).await;
        let outcome = if fix.is_success() {
            info!(command = %command, attempt, "Fix succeeded");
            results.mark_fixed(position);
            FixOutcome::Applied
        } else {
            if let Some(first) = fix.first_failure() {
                if let Some(error) = first.error.clone() {
                    results.record_fix_failure(position, first.output.clone(), error);
                }
            }
            warn!(command = %command, attempt, failed = fix.failed(), "Fix failed");
            FixOutcome::Failed
        };
        results.append_fixes(position, fix);
        outcome
    }

    async fn request_fix(
        &self,
        cancel: &CancellationToken,
        command: &str,
        output: &str,
        attempt: u32,
    ) -> Result<Plan> {
        let timeout = self.config.fix_timeout();
        let request = self.planner.generate_error_fix(command, output, attempt);
        tokio::select! {
            result = tokio::time::timeout(timeout, request) => {
                result.unwrap_or(Err(Error::FixTimeout(timeout)))
            }
            _ = cancel.cancelled() => Err(Error::Cancelled),
        }
    }
}
