//! Plan - model-proposed command sequences
//!
//! A [`Plan`] is produced by the language-model client and consumed as-is.
//! Only `commands` is functionally significant; `summary` and `warnings` are
//! carried through for display.

use serde::{Deserialize, Serialize};

/// A single argv-style command proposed by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCommand {
    /// Executable followed by its arguments, never passed through a shell
    #[serde(rename = "command", default)]
    pub argv: Vec<String>,
    /// Human-readable explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the command must run with elevated privileges
    #[serde(default)]
    pub needs_root: bool,
}

impl PlannedCommand {
    /// Create a command from argv tokens
    #[must_use]
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            description: None,
            needs_root: false,
        }
    }

    /// Mark the command as requiring elevation
    #[must_use]
    pub fn with_root(mut self, needs_root: bool) -> Self {
        self.needs_root = needs_root;
        self
    }

    /// Executable name or path (`argv[0]`)
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Canonical display string, see [`render_argv`]
    #[must_use]
    pub fn render(&self) -> String {
        render_argv(&self.argv)
    }
}

/// An ordered list of commands plus display metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Short summary of what the plan does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Commands, executed strictly in order
    #[serde(default)]
    pub commands: Vec<PlannedCommand>,
    /// Caveats surfaced by the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Plan {
    /// Create a plan from commands
    #[must_use]
    pub fn new(commands: Vec<PlannedCommand>) -> Self {
        Self {
            summary: None,
            commands,
            warnings: Vec::new(),
        }
    }

    /// Parse the JSON shape emitted by the model client
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    /// Number of commands
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the plan has no commands
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop commands beyond `max`, recording a warning.
    ///
    /// Returns the number of commands removed. `max == 0` disables the limit.
    pub fn truncate_commands(&mut self, max: usize) -> usize {
        if max == 0 || self.commands.len() <= max {
            return 0;
        }
        let dropped = self.commands.len() - max;
        self.commands.truncate(max);
        self.warnings.push(format!(
            "plan truncated to {} commands ({} dropped)",
            max, dropped
        ));
        dropped
    }
}

/// Render argv as a single display string.
///
/// Arguments are joined with single spaces. An argument containing a space,
/// tab, newline or single quote is written double-quoted with `\\`, `"`, and
/// control characters escaped. The result is for logging and pattern matching
/// only and is never parsed back into argv.
#[must_use]
pub fn render_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| render_arg(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_arg(arg: &str) -> String {
    let needs_quoting = arg.is_empty()
        || arg
            .chars()
            .any(|c| matches!(c, ' ' | '\t' | '\n' | '\''));
    if !needs_quoting {
        return arg.to_string();
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\x00"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
