//! Resource limits for sandboxed commands

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wall-clock ceiling used when none is configured
pub const DEFAULT_MAX_EXECUTION_SECS: u64 = 30;

/// How often memory and CPU are sampled
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Limits enforced by the [`Monitor`](super::Monitor).
///
/// Memory and CPU are advisory: they are polled, not kernel-enforced, so a
/// burst shorter than one poll interval can go unnoticed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Wall-clock ceiling in seconds (0 = default)
    #[serde(default = "default_max_execution_secs")]
    pub max_execution_secs: u64,
    /// Resident memory ceiling in MiB
    #[serde(default)]
    pub max_memory_mb: Option<u64>,
    /// CPU usage ceiling in percent of one core
    #[serde(default)]
    pub max_cpu_percent: Option<f32>,
    /// Sampling interval for memory/CPU in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_max_execution_secs() -> u64 {
    DEFAULT_MAX_EXECUTION_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_execution_secs: DEFAULT_MAX_EXECUTION_SECS,
            max_memory_mb: None,
            max_cpu_percent: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ResourceLimits {
    /// Set the wall-clock ceiling
    #[must_use]
    pub fn with_max_execution_secs(mut self, secs: u64) -> Self {
        self.max_execution_secs = secs;
        self
    }

    /// Set the memory ceiling
    #[must_use]
    pub fn with_max_memory_mb(mut self, mb: u64) -> Self {
        self.max_memory_mb = Some(mb);
        self
    }

    /// Set the CPU ceiling
    #[must_use]
    pub fn with_max_cpu_percent(mut self, percent: f32) -> Self {
        self.max_cpu_percent = Some(percent);
        self
    }

    /// Effective wall-clock ceiling
    #[must_use]
    pub fn max_execution_time(&self) -> Duration {
        match self.max_execution_secs {
            0 => Duration::from_secs(DEFAULT_MAX_EXECUTION_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Sampling interval, never below 10ms
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    /// Whether memory or CPU needs polling
    #[must_use]
    pub fn polls_usage(&self) -> bool {
        self.max_memory_mb.is_some() || self.max_cpu_percent.is_some()
    }

    /// Describe the first limit a usage sample exceeds
    #[must_use]
    pub fn violation(&self, memory_bytes: u64, cpu_percent: f32) -> Option<String> {
        let memory_mb = memory_bytes / 1024 / 1024;
        if let Some(max) = self.max_memory_mb {
            if memory_mb > max {
                return Some(format!("memory {} MB > {} MB", memory_mb, max));
            }
        }
        if let Some(max) = self.max_cpu_percent {
            if cpu_percent > max {
                return Some(format!("cpu {:.1}% > {:.1}%", cpu_percent, max));
            }
        }
        None
    }
}
