//! Executor configuration

use crate::output::DEFAULT_MAX_OUTPUT_BYTES;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-command timeout used when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// PATH used when the parent process has none
pub const FALLBACK_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";

/// Configuration for the executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Per-command timeout in seconds (0 = default)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Capture ceiling for combined output
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Elevation prefix for `needs_root` commands, e.g. `"sudo -n"`
    #[serde(default)]
    pub elevation_command: Option<String>,
    /// PATH handed to children when the parent has none
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

fn default_fallback_path() -> String {
    FALLBACK_PATH.to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            elevation_command: None,
            fallback_path: default_fallback_path(),
        }
    }
}

impl ExecutorConfig {
    /// Set the per-command timeout
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the elevation command
    #[must_use]
    pub fn with_elevation(mut self, command: impl Into<String>) -> Self {
        self.elevation_command = Some(command.into());
        self
    }

    /// Set the output capture ceiling
    #[must_use]
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Effective per-command timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Elevation tokens, whitespace-split without any shell expansion
    #[must_use]
    pub fn elevation_tokens(&self) -> Vec<String> {
        self.elevation_command
            .as_deref()
            .map(|cmd| cmd.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// PATH for child processes: the parent's, or the fallback
    #[must_use]
    pub fn child_path(&self) -> String {
        std::env::var("PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.fallback_path.clone())
    }
}
