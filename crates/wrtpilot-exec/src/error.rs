//! Error types for wrtpilot-exec

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single command, attached to its [`CommandResult`](crate::CommandResult).
///
/// These never abort a plan: the executor records them and moves on to the
/// next command.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExecError {
    /// The argv was empty, nothing was spawned
    #[error("empty command")]
    EmptyCommand,

    /// The process could not be started
    #[error("failed to start {program}: {message}")]
    Spawn {
        /// Executable that failed to start
        program: String,
        /// OS error text
        message: String,
    },

    /// The process exited with a non-zero status
    #[error("exit status {code}")]
    Exit {
        /// Exit code
        code: i32,
    },

    /// The process was terminated by a signal
    #[error("terminated by signal {signal}")]
    Signal {
        /// Signal number
        signal: i32,
    },

    /// The per-command timeout elapsed
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The caller cancelled execution
    #[error("cancelled")]
    Cancelled,

    /// The sandbox monitor killed the process group
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// The sandbox refused to run the command
    #[error("rejected by sandbox: {0}")]
    Rejected(String),

    /// IO failure while supervising the process
    #[error("io error: {0}")]
    Io(String),
}

/// Operation-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Command failed sandbox validation
    #[error("sandbox validation failed: {0}")]
    Validation(String),

    /// Scratch directory could not be prepared
    #[error("sandbox setup failed for {path}: {source}")]
    Setup {
        /// Path that could not be created
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
