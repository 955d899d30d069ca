//! Policy and retry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of fix attempts per failing command
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default ceiling on commands per plan
pub const DEFAULT_MAX_COMMANDS: usize = 20;

/// Default bound on a single fix request
pub const DEFAULT_FIX_TIMEOUT_SECS: u64 = 30;

/// Allow/deny pattern lists for the [`PolicyEngine`](crate::PolicyEngine)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Regexes a command must match one of (empty = allow all)
    #[serde(default)]
    pub allow: Vec<String>,
    /// Regexes that always reject, checked before `allow`
    #[serde(default)]
    pub deny: Vec<String>,
}

impl PolicyConfig {
    /// Set the allow patterns
    #[must_use]
    pub fn with_allow<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the deny patterns
    #[must_use]
    pub fn with_deny<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny = patterns.into_iter().map(Into::into).collect();
        self
    }
}

/// Auto-retry behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Whether failed commands are sent to the fix planner
    #[serde(default)]
    pub enabled: bool,
    /// Fix attempts per failing command (0 disables retry)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Commands kept from any plan, original or fix (0 = unlimited)
    #[serde(default = "default_max_commands")]
    pub max_commands: usize,
    /// Bound on each fix request in seconds (0 = default)
    #[serde(default = "default_fix_timeout_secs")]
    pub fix_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_max_commands() -> usize {
    DEFAULT_MAX_COMMANDS
}

fn default_fix_timeout_secs() -> u64 {
    DEFAULT_FIX_TIMEOUT_SECS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: DEFAULT_MAX_RETRIES,
            max_commands: DEFAULT_MAX_COMMANDS,
            fix_timeout_secs: DEFAULT_FIX_TIMEOUT_SECS,
        }
    }
}

impl RetryConfig {
    /// Enabled configuration with the given attempt ceiling
    #[must_use]
    pub fn enabled(max_retries: u32) -> Self {
        Self {
            enabled: true,
            max_retries,
            ..Self::default()
        }
    }

    /// Set the fix request bound
    #[must_use]
    pub fn with_fix_timeout_secs(mut self, secs: u64) -> Self {
        self.fix_timeout_secs = secs;
        self
    }

    /// Set the per-plan command ceiling
    #[must_use]
    pub fn with_max_commands(mut self, max: usize) -> Self {
        self.max_commands = max;
        self
    }

    /// Effective fix request bound
    #[must_use]
    pub fn fix_timeout(&self) -> Duration {
        match self.fix_timeout_secs {
            0 => Duration::from_secs(DEFAULT_FIX_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Whether the orchestrator should do anything at all
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.max_retries > 0
    }
}
