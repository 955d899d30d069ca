//! Configuration loading
//!
//! Sources, lowest priority first: embedded defaults, `config/local.toml`,
//! the `--config` file, then `WRTPILOT_*` environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use wrtpilot_core::{PolicyConfig, RetryConfig};
use wrtpilot_exec::{ExecutorConfig, SandboxConfig};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Load configuration from files and environment
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/local").required(false));

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    // prefix_separator("_") keeps WRTPILOT_EXECUTOR__TIMEOUT_SECS working;
    // config 0.14 would otherwise expect WRTPILOT__EXECUTOR__...
    let config = builder
        .add_source(
            Environment::with_prefix("WRTPILOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}
