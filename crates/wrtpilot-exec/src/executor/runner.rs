//! Command runner strategy
//!
//! The executor never spawns processes itself; it hands each prepared argv to
//! a [`CommandRunner`]. [`ProcessRunner`](super::ProcessRunner) runs it
//! directly, [`SandboxRunner`](crate::sandbox::SandboxRunner) runs it inside a
//! scratch directory under a resource monitor, and tests plug in fakes.

use crate::error::ExecError;
use crate::output::{OutputBuffer, OutputSink};
use chrono::{DateTime, Utc};
use std::process::ExitStatus;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything a runner needs to execute one command
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    /// Final argv, elevation prefix already applied
    pub argv: &'a [String],
    /// Value for the child's `PATH`, the only inherited variable
    pub path: &'a str,
    /// Wall-clock ceiling for this command
    pub timeout: Duration,
    /// Capture ceiling for combined output
    pub max_output_bytes: usize,
    /// Cancellation from the caller
    pub cancel: &'a CancellationToken,
}

/// What a runner reports back
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Combined output, bounded
    pub output: String,
    /// Whether the ceiling was hit
    pub truncated: bool,
    /// Failure, `None` on success
    pub error: Option<ExecError>,
    /// Spawn-to-wait duration
    pub elapsed: Duration,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
}

impl RunOutput {
    /// Successful run with the given output
    #[must_use]
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            truncated: false,
            error: None,
            elapsed: Duration::ZERO,
            started_at: Utc::now(),
        }
    }

    /// Failed run with the given output
    #[must_use]
    pub fn failure(output: impl Into<String>, error: ExecError) -> Self {
        Self {
            error: Some(error),
            ..Self::success(output)
        }
    }

    /// Set the elapsed time and start timestamp
    #[must_use]
    pub fn timed(mut self, started_at: DateTime<Utc>, elapsed: Duration) -> Self {
        self.started_at = started_at;
        self.elapsed = elapsed;
        self
    }

    /// Assemble from a finished wait and its captured output
    pub(crate) fn from_wait(
        status: Result<ExitStatus, ExecError>,
        buffer: OutputBuffer,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let (output, truncated) = buffer.finish();
        let error = match status {
            Ok(status) => status_error(status),
            Err(e) => Some(e),
        };
        Self {
            output,
            truncated,
            error,
            elapsed,
            started_at,
        }
    }
}

/// Executes a single prepared command
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `request.argv`, streaming lines to `sink` when one is given.
    ///
    /// Failures are reported in [`RunOutput::error`], never as a panic.
    async fn run(&self, request: RunRequest<'_>, sink: Option<&mut dyn OutputSink>) -> RunOutput;
}

/// Map a non-success exit status to an error
pub(crate) fn status_error(status: ExitStatus) -> Option<ExecError> {
    if status.success() {
        return None;
    }
    if let Some(code) = status.code() {
        return Some(ExecError::Exit { code });
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(ExecError::Signal { signal });
        }
    }
    Some(ExecError::Exit { code: -1 })
}
