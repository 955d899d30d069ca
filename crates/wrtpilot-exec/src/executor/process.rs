//! Direct OS-process runner

use super::capture::collect_output;
use super::runner::{CommandRunner, RunOutput, RunRequest};
use crate::error::ExecError;
use crate::output::OutputSink;
use chrono::Utc;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Runs argv as a direct child process with a `PATH`-only environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a process runner
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Build an unstarted command with piped output and a cleared environment
pub(crate) fn base_command(argv: &[String], path: &str) -> Option<Command> {
    let (program, args) = argv.split_first()?;
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_clear()
        .env("PATH", path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    Some(cmd)
}

pub(crate) fn spawn_error(program: &str, err: &std::io::Error) -> ExecError {
    ExecError::Spawn {
        program: program.to_string(),
        message: err.to_string(),
    }
}

async fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ExitStatus, ExecError> {
    tokio::select! {
        status = child.wait() => status.map_err(|e| ExecError::Io(e.to_string())),
        _ = tokio::time::sleep(timeout) => {
            terminate(child).await;
            Err(ExecError::Timeout(timeout))
        }
        _ = cancel.cancelled() => {
            terminate(child).await;
            Err(ExecError::Cancelled)
        }
    }
}

async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Kill after deadline failed, process likely gone");
    }
}

#[async_trait::async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, request: RunRequest<'_>, sink: Option<&mut dyn OutputSink>) -> RunOutput {
        let started_at = Utc::now();
        let Some(mut command) = base_command(request.argv, request.path) else {
            return RunOutput::failure("", ExecError::EmptyCommand).timed(started_at, Duration::ZERO);
        };

        let start = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let program = request.argv.first().map(String::as_str).unwrap_or_default();
                warn!(program = %program, error = %e, "Failed to spawn command");
                return RunOutput::failure("", spawn_error(program, &e))
                    .timed(started_at, start.elapsed());
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let wait = async {
            let status = wait_with_deadline(&mut child, request.timeout, request.cancel).await;
            (status, start.elapsed())
        };
        let ((status, elapsed), buffer) =
            collect_output(stdout, stderr, request.max_output_bytes, sink, wait).await;

        RunOutput::from_wait(status, buffer, started_at, elapsed)
    }
}
