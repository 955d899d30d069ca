//! wrtpilot Exec - Command Execution Engine
//!
//! This crate turns validated argv plans into running processes:
//! - Plan: model-proposed commands and their canonical rendering
//! - Executor: direct, shell-free execution with timeouts and bounded capture
//! - Output: live line sinks and the truncating accumulator
//! - Sandbox: scratch-directory execution under a process-group monitor

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod executor;
pub mod output;
pub mod plan;
pub mod result;
pub mod sandbox;

pub use error::{Error, ExecError, Result};
pub use executor::{CommandRunner, Executor, ExecutorConfig, ProcessRunner, RunOutput, RunRequest};
pub use output::{
    OutputBuffer, OutputLine, OutputSink, OutputStream, WriterSink, DEFAULT_MAX_OUTPUT_BYTES,
    TRUNCATION_MARKER,
};
pub use plan::{render_argv, Plan, PlannedCommand};
pub use result::{CommandResult, Results};
pub use sandbox::{Monitor, ResourceLimits, Sandbox, SandboxConfig, SandboxRunner};
