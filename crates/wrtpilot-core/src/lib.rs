//! wrtpilot Core - Policy and Auto-Retry
//!
//! This crate decides what may run and recovers from what failed:
//! - Policy: structural checks plus allow/deny regex gating of every plan
//! - Retry: bounded fix loop driven by an external [`FixPlanner`]
//! - Config: typed policy and retry settings

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod policy;
pub mod retry;

pub use config::{PolicyConfig, RetryConfig};
pub use error::{Error, PolicyViolation, Result};
pub use policy::PolicyEngine;
pub use retry::{AutoRetry, FixPlanner, RetryReport};
