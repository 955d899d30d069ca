//! [`CommandRunner`] that executes inside a [`Sandbox`]

use super::Sandbox;
use crate::error::{Error, ExecError};
use crate::executor::{collect_output, spawn_error, CommandRunner, RunOutput, RunRequest};
use crate::output::OutputSink;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Runs each command through sandbox validation, scratch setup and the monitor
#[derive(Debug, Clone)]
pub struct SandboxRunner {
    sandbox: Arc<Sandbox>,
}

impl SandboxRunner {
    /// Wrap a sandbox
    #[must_use]
    pub fn new(sandbox: Sandbox) -> Self {
        Self {
            sandbox: Arc::new(sandbox),
        }
    }

    /// The wrapped sandbox
    #[must_use]
    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }
}

#[async_trait::async_trait]
impl CommandRunner for SandboxRunner {
    async fn run(&self, request: RunRequest<'_>, sink: Option<&mut dyn OutputSink>) -> RunOutput {
        let started_at = Utc::now();
        let program = request.argv.first().map(String::as_str).unwrap_or_default();

        if let Err(e) = self.sandbox.validate_command(request.argv) {
            let reason = match e {
                Error::Validation(reason) => reason,
                other => other.to_string(),
            };
            warn!(program = %program, %reason, "Sandbox rejected command");
            return RunOutput::failure("", ExecError::Rejected(reason))
                .timed(started_at, Duration::ZERO);
        }

        if let Err(e) = self.sandbox.cleanup() {
            warn!(error = %e, "Sandbox cleanup failed");
        }

        let mut command = match self.sandbox.execute_command(request.argv, request.path) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "Sandbox setup failed");
                return RunOutput::failure("", ExecError::Io(e.to_string()))
                    .timed(started_at, Duration::ZERO);
            }
        };

        let start = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %program, error = %e, "Failed to spawn sandboxed command");
                return RunOutput::failure("", spawn_error(program, &e))
                    .timed(started_at, start.elapsed());
            }
        };

        let monitor = self
            .sandbox
            .monitor()
            .with_max_execution(request.timeout.min(self.sandbox.limits().max_execution_time()));

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let wait = async {
            let status = monitor.wait(&mut child, request.cancel).await;
            (status, start.elapsed())
        };
        let ((status, elapsed), buffer) =
            collect_output(stdout, stderr, request.max_output_bytes, sink, wait).await;

        RunOutput::from_wait(status, buffer, started_at, elapsed)
    }
}
