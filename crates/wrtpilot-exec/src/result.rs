//! Execution results

use crate::error::ExecError;
use crate::plan::render_argv;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of one command
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    /// Position of the command in the plan it came from
    pub index: usize,
    /// The argv that actually ran (including any elevation prefix)
    pub argv: Vec<String>,
    /// Combined stdout and stderr, bounded
    pub output: String,
    /// Failure, `None` on success
    pub error: Option<ExecError>,
    /// Wall time from just before spawn to just after wait
    pub elapsed: Duration,
    /// Whether `output` hit the capture ceiling
    pub truncated: bool,
    /// When the command was started
    pub started_at: DateTime<Utc>,
    /// For fix results appended by auto-retry: index into `Results::items` of
    /// the failure this command was meant to fix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_for: Option<usize>,
}

impl CommandResult {
    /// A result that failed before anything was spawned
    #[must_use]
    pub fn rejected(index: usize, argv: Vec<String>, error: ExecError) -> Self {
        Self {
            index,
            argv,
            output: String::new(),
            error: Some(error),
            elapsed: Duration::ZERO,
            truncated: false,
            started_at: Utc::now(),
            fix_for: None,
        }
    }

    /// Whether the command succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Canonical display of the argv that ran
    #[must_use]
    pub fn command_line(&self) -> String {
        render_argv(&self.argv)
    }
}

/// Ordered results of one plan execution.
///
/// The failure counter is only changed through the methods below, so
/// [`Results::failed`] always equals the number of `items` carrying an error.
/// Fix results recorded during auto-retry live in the separate `fixes` list
/// and do not count towards it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Results {
    items: Vec<CommandResult>,
    fixes: Vec<CommandResult>,
    failed: usize,
}

impl Results {
    /// Create an empty result set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a primary result
    pub fn push(&mut self, result: CommandResult) {
        if result.error.is_some() {
            self.failed += 1;
        }
        self.items.push(result);
    }

    /// Primary results, in plan order
    #[must_use]
    pub fn items(&self) -> &[CommandResult] {
        &self.items
    }

    /// Fix results appended by auto-retry, in the order they ran
    #[must_use]
    pub fn fixes(&self) -> &[CommandResult] {
        &self.fixes
    }

    /// Number of failed primary results
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Whether every primary result succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Positions of the currently failing primary results
    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, r)| r.error.is_some())
            .map(|(i, _)| i)
            .collect()
    }

    /// Clear the error of a failed item after a successful fix
    pub fn mark_fixed(&mut self, position: usize) {
        if let Some(item) = self.items.get_mut(position) {
            if item.error.take().is_some() {
                self.failed -= 1;
            }
        }
    }

    /// Replace a failed item's output and error with the latest fix failure
    pub fn record_fix_failure(&mut self, position: usize, output: String, error: ExecError) {
        if let Some(item) = self.items.get_mut(position) {
            if item.error.is_none() {
                self.failed += 1;
            }
            item.output = output;
            item.error = Some(error);
        }
    }

    /// Append fix results for audit, tagging them with the item they targeted
    pub fn append_fixes(&mut self, position: usize, fixes: Results) {
        self.fixes
            .extend(fixes.items.into_iter().map(|mut r| {
                r.fix_for = Some(position);
                r
            }));
        self.fixes.extend(fixes.fixes);
    }

    /// First failing primary result, if any
    #[must_use]
    pub fn first_failure(&self) -> Option<&CommandResult> {
        self.items.iter().find(|r| r.error.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(index: usize) -> CommandResult {
        CommandResult {
            index,
            argv: vec![format!("cmd{}", index)],
            output: String::new(),
            error: None,
            elapsed: Duration::ZERO,
            truncated: false,
            started_at: Utc::now(),
            fix_for: None,
        }
    }

    fn failed(index: usize) -> CommandResult {
        CommandResult::rejected(index, vec![format!("cmd{}", index)], ExecError::Exit { code: 1 })
    }

    fn count_errors(results: &Results) -> usize {
        results.items().iter().filter(|r| r.error.is_some()).count()
    }

    #[test]
    fn test_push_tracks_failures() {
        let mut results = Results::new();
        results.push(ok(0));
        results.push(failed(1));
        results.push(failed(2));
        assert_eq!(results.failed(), 2);
        assert_eq!(results.failed_indices(), vec![1, 2]);
        assert_eq!(results.first_failure().map(|r| r.index), Some(1));
    }

    #[test]
    fn test_mark_fixed_is_idempotent() {
        let mut results = Results::new();
        results.push(failed(0));
        results.mark_fixed(0);
        results.mark_fixed(0);
        results.mark_fixed(7);
        assert_eq!(results.failed(), 0);
        assert_eq!(count_errors(&results), 0);
    }

    #[test]
    fn test_record_fix_failure_overwrites() {
        let mut results = Results::new();
        results.push(failed(0));
        results.record_fix_failure(0, "new output".into(), ExecError::Exit { code: 2 });
        assert_eq!(results.failed(), 1);
        assert_eq!(results.items()[0].output, "new output");
        assert_eq!(results.items()[0].error, Some(ExecError::Exit { code: 2 }));
    }

    #[test]
    fn test_append_fixes_does_not_touch_counter() {
        let mut results = Results::new();
        results.push(failed(0));

        let mut fix = Results::new();
        fix.push(failed(0));
        results.append_fixes(0, fix);

        assert_eq!(results.failed(), 1);
        assert_eq!(results.failed(), count_errors(&results));
        assert_eq!(results.fixes().len(), 1);
        assert_eq!(results.fixes()[0].fix_for, Some(0));
    }
}
