//! Sandbox configuration

use super::limits::ResourceLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the [`Sandbox`](super::Sandbox)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Parent directory for scratch directories (OS temp dir when unset)
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Limits applied to every sandboxed command
    #[serde(default)]
    pub limits: ResourceLimits,
}

impl SandboxConfig {
    /// Set the scratch parent directory
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set the resource limits
    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Effective scratch parent directory
    #[must_use]
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(std::env::temp_dir)
    }
}
