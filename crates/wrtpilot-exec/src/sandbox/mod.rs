//! Sandbox - stricter execution surface
//!
//! Commands run in a per-instance scratch directory with only `PATH` and
//! `HOME` set, in their own process group, under a [`Monitor`]. Isolation
//! relies on ordinary process groups and polling; there are no namespaces or
//! cgroups involved.
//!
//! A `Sandbox` is not meant to be shared by concurrent commands: cleanup of
//! one run could race with files of another. Use one instance per concurrent
//! execution.

mod config;
mod limits;
mod monitor;
mod runner;

#[cfg(test)]
mod tests;

pub use config::SandboxConfig;
pub use limits::{ResourceLimits, DEFAULT_MAX_EXECUTION_SECS, DEFAULT_POLL_INTERVAL_MS};
pub use monitor::{Monitor, Watch};
pub use runner::SandboxRunner;

use crate::error::{Error, Result};
use crate::executor::base_command;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};
use tokio::process::Command;
use tracing::{debug, info};

/// Entries older than this are removed by [`Sandbox::cleanup`]
pub const CLEANUP_AGE: Duration = Duration::from_secs(60 * 60);

/// Argument fragments refused inside the sandbox
const FORBIDDEN_SEQUENCES: &[&str] = &["&&", "|", "`", "$(", "../", "/dev/", "/proc/", "/sys/"];

/// Isolated execution context with a lazily created scratch directory
#[derive(Debug)]
pub struct Sandbox {
    config: SandboxConfig,
    scratch: OnceLock<PathBuf>,
}

impl Sandbox {
    /// Create a sandbox; nothing touches the filesystem until first use
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            scratch: OnceLock::new(),
        }
    }

    /// Active resource limits
    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.config.limits
    }

    /// Monitor configured with this sandbox's limits
    #[must_use]
    pub fn monitor(&self) -> Monitor {
        Monitor::new(self.config.limits.clone())
    }

    /// Scratch directory, created on first call
    pub fn scratch_dir(&self) -> Result<&Path> {
        if let Some(dir) = self.scratch.get() {
            return Ok(dir);
        }
        let dir = create_scratch(&self.config.root_dir())?;
        Ok(self.scratch.get_or_init(|| dir))
    }

    /// Reject chaining and filesystem-escape sequences in any argument
    pub fn validate_command(&self, argv: &[String]) -> Result<()> {
        if argv.is_empty() {
            return Err(Error::Validation("empty command".to_string()));
        }
        for arg in argv {
            if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|seq| arg.contains(**seq)) {
                return Err(Error::Validation(format!(
                    "argument {:?} contains forbidden sequence {:?}",
                    arg, seq
                )));
            }
        }
        Ok(())
    }

    /// Build an unstarted process rooted at the scratch directory.
    ///
    /// The child gets `PATH` and `HOME` only and leads its own process group.
    pub fn execute_command(&self, argv: &[String], path: &str) -> Result<Command> {
        let scratch = self.scratch_dir()?;
        let mut cmd = base_command(argv, path)
            .ok_or_else(|| Error::Validation("empty command".to_string()))?;
        cmd.current_dir(scratch).env("HOME", scratch);
        #[cfg(unix)]
        cmd.process_group(0);
        Ok(cmd)
    }

    /// Remove scratch entries older than [`CLEANUP_AGE`].
    ///
    /// Returns how many entries were removed. A scratch directory that was
    /// never created is left alone.
    pub fn cleanup(&self) -> Result<usize> {
        let Some(dir) = self.scratch.get() else {
            return Ok(0);
        };
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let stale = now
                .duration_since(modified)
                .map(|age| age > CLEANUP_AGE)
                .unwrap_or(false);
            if !stale {
                continue;
            }
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => debug!(path = %path.display(), error = %e, "Failed to remove stale entry"),
            }
        }
        if removed > 0 {
            info!(removed, dir = %dir.display(), "Cleaned up sandbox scratch directory");
        }
        Ok(removed)
    }
}

fn create_scratch(root: &Path) -> Result<PathBuf> {
    let dir = root.join(format!(
        "wrtpilot-sandbox-{}-{}",
        std::process::id(),
        uuid::Uuid::new_v4().simple()
    ));
    let setup = |source: std::io::Error| Error::Setup {
        path: dir.display().to_string(),
        source,
    };
    std::fs::create_dir_all(&dir).map_err(setup)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700)).map_err(setup)?;
    }
    debug!(dir = %dir.display(), "Created sandbox scratch directory");
    Ok(dir)
}
