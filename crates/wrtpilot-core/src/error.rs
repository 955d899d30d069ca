//! Error types for wrtpilot-core

use std::time::Duration;
use thiserror::Error;

/// Structural or policy rejection of a planned command.
///
/// `index` is the 0-based position in the plan; messages number commands
/// from 1 the way an operator reads them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// The argv has no tokens
    #[error("command {} is empty", .index + 1)]
    EmptyCommand {
        /// Position in the plan
        index: usize,
    },

    /// An argument is empty or whitespace-only
    #[error("command {}: argument {} is empty", .index + 1, .arg + 1)]
    EmptyArgument {
        /// Position in the plan
        index: usize,
        /// Position in the argv
        arg: usize,
    },

    /// An argument contains a NUL byte
    #[error("command {}: argument {} contains a NUL byte", .index + 1, .arg + 1)]
    NulByte {
        /// Position in the plan
        index: usize,
        /// Position in the argv
        arg: usize,
    },

    /// The executable token contains shell metacharacters
    #[error("command {}: executable {:?} contains shell metacharacters", .index + 1, .program)]
    ShellMetacharacter {
        /// Position in the plan
        index: usize,
        /// The offending executable token
        program: String,
    },

    /// The rendered command matched a deny pattern
    #[error("command {} blocked by denylist: {}", .index + 1, .command)]
    Denied {
        /// Position in the plan
        index: usize,
        /// Rendered command
        command: String,
        /// Pattern that matched
        pattern: String,
    },

    /// The rendered command matched no allow pattern
    #[error("command {} not permitted by allowlist: {}", .index + 1, .command)]
    NotAllowed {
        /// Position in the plan
        index: usize,
        /// Rendered command
        command: String,
    },
}

impl PolicyViolation {
    /// Position of the rejected command in its plan
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::EmptyCommand { index }
            | Self::EmptyArgument { index, .. }
            | Self::NulByte { index, .. }
            | Self::ShellMetacharacter { index, .. }
            | Self::Denied { index, .. }
            | Self::NotAllowed { index, .. } => *index,
        }
    }
}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// The fix planner failed
    #[error("fix planner error: {0}")]
    Planner(String),

    /// The fix planner did not answer in time
    #[error("fix generation timed out after {}s", .0.as_secs())]
    FixTimeout(Duration),

    /// The caller cancelled
    #[error("cancelled")]
    Cancelled,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
