//! Monitor - limit enforcement for a started process
//!
//! A background watch enforces the wall-clock ceiling and, when configured,
//! polls memory and CPU. On a breach the violation is recorded first and then
//! the whole process group is killed, so the waiter always sees why.

use super::limits::ResourceLimits;
use crate::error::ExecError;
use std::process::ExitStatus;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use sysinfo::{Pid, System};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Enforces [`ResourceLimits`] on a started process
#[derive(Debug, Clone)]
pub struct Monitor {
    limits: ResourceLimits,
    max_execution: Duration,
}

impl Monitor {
    /// Create a monitor for the given limits
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        let max_execution = limits.max_execution_time();
        Self {
            limits,
            max_execution,
        }
    }

    /// Override the wall-clock ceiling
    #[must_use]
    pub fn with_max_execution(mut self, max: Duration) -> Self {
        self.max_execution = max;
        self
    }

    /// Start watching `pid`. A process that never started yields an idle watch.
    #[must_use]
    pub fn watch(&self, pid: Option<u32>) -> Watch {
        let tripped = Arc::new(OnceLock::new());
        let task = pid.map(|pid| {
            tokio::spawn(enforce(
                pid,
                self.limits.clone(),
                self.max_execution,
                tripped.clone(),
            ))
        });
        Watch { task, tripped }
    }

    /// Wait for `child` under the limits.
    ///
    /// Returns the limit violation instead of the exit status when the watch
    /// killed the process. After the leader exits any processes left in its
    /// group are killed as well.
    pub async fn wait(
        &self,
        child: &mut Child,
        cancel: &CancellationToken,
    ) -> Result<ExitStatus, ExecError> {
        let pid = child.id();
        let watch = self.watch(pid);

        let status = tokio::select! {
            status = child.wait() => status.map_err(|e| ExecError::Io(e.to_string())),
            _ = cancel.cancelled() => {
                if let Some(pid) = pid {
                    kill_group(pid);
                }
                if let Err(e) = child.wait().await {
                    debug!(error = %e, "Reaping cancelled process failed");
                }
                Err(ExecError::Cancelled)
            }
        };

        // The leader is reaped by now. Its pid stays reserved while any group
        // member is alive; once the group is empty a new group leader could
        // reuse it before this sweep, which is a narrow but real window.
        if let Some(pid) = pid {
            kill_group(pid);
        }
        match watch.finish() {
            Some(violation) => Err(violation),
            None => status,
        }
    }
}

/// Handle to a running watch
#[derive(Debug)]
pub struct Watch {
    task: Option<JoinHandle<()>>,
    tripped: Arc<OnceLock<ExecError>>,
}

impl Watch {
    /// Stop watching and return the violation, if one was enforced
    #[must_use]
    pub fn finish(self) -> Option<ExecError> {
        if let Some(task) = self.task {
            task.abort();
        }
        self.tripped.get().cloned()
    }
}

async fn enforce(
    pid: u32,
    limits: ResourceLimits,
    max_execution: Duration,
    tripped: Arc<OnceLock<ExecError>>,
) {
    // sleep() saturates oversized ceilings
    let deadline = tokio::time::sleep(max_execution);
    tokio::pin!(deadline);

    let mut system = limits.polls_usage().then(System::new);
    let mut ticker = tokio::time::interval(limits.poll_interval());

    loop {
        tokio::select! {
            _ = &mut deadline => {
                warn!(pid, limit_secs = max_execution.as_secs(), "Execution time exceeded, killing process group");
                let _ = tripped.set(ExecError::Timeout(max_execution));
                kill_group(pid);
                return;
            }
            _ = ticker.tick(), if system.is_some() => {
                let Some(system) = system.as_mut() else { continue };
                if let Some(violation) = sample(system, pid, &limits) {
                    warn!(pid, %violation, "Resource limit exceeded, killing process group");
                    let _ = tripped.set(ExecError::ResourceLimit(violation));
                    kill_group(pid);
                    return;
                }
            }
        }
    }
}

fn sample(system: &mut System, pid: u32, limits: &ResourceLimits) -> Option<String> {
    let pid = Pid::from_u32(pid);
    if !system.refresh_process(pid) {
        return None;
    }
    let process = system.process(pid)?;
    limits.violation(process.memory(), process.cpu_usage())
}

/// Kill every process in the group led by `pid`
#[cfg(unix)]
pub(crate) fn kill_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match killpg(nix::unistd::Pid::from_raw(raw), Signal::SIGKILL) {
        // ESRCH means the group is already gone
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => debug!(pid, error = %e, "Failed to signal process group"),
    }
}

/// Kill the leader; descendants are not tracked on this platform
#[cfg(not(unix))]
pub(crate) fn kill_group(pid: u32) {
    let mut system = System::new();
    let pid = Pid::from_u32(pid);
    if system.refresh_process(pid) {
        if let Some(process) = system.process(pid) {
            if !process.kill() {
                debug!(%pid, "Failed to kill process");
            }
        }
    }
}
