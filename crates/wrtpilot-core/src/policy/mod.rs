//! Policy engine - gate between model output and execution
//!
//! Every command of a plan goes through the same checks, in order:
//! 1. argv must not be empty
//! 2. no empty/whitespace-only argument, no NUL byte
//! 3. the executable token must not contain shell metacharacters
//! 4. the rendered command must match no deny pattern
//! 5. if allow patterns exist, the rendered command must match one
//!
//! Patterns are compiled once. The engine holds no mutable state, so the same
//! instance can validate original plans and fix plans concurrently.


use crate::config::PolicyConfig;
use crate::error::PolicyViolation;
use regex::Regex;
use tracing::{debug, warn};
use wrtpilot_exec::{Plan, PlannedCommand};

/// Characters that must never appear in an executable token
const SHELL_METACHARACTERS: &[char] = &['|', '&', ';', '<', '>', '`', '$'];

/// Compiled allow/deny patterns
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    allow: Vec<Regex>,
    deny: Vec<Regex>,
}

impl PolicyEngine {
    /// Compile pattern lists; invalid patterns are logged and dropped
    pub fn new<A, D, S>(allow: A, deny: D) -> Self
    where
        A: IntoIterator<Item = S>,
        D: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allow: compile(allow, "allow"),
            deny: compile(deny, "deny"),
        }
    }

    /// Build from configuration
    #[must_use]
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(&config.allow, &config.deny)
    }

    /// Number of active allow patterns
    #[must_use]
    pub fn allow_count(&self) -> usize {
        self.allow.len()
    }

    /// Number of active deny patterns
    #[must_use]
    pub fn deny_count(&self) -> usize {
        self.deny.len()
    }

    /// Validate every command of a plan, stopping at the first violation
    pub fn validate_plan(&self, plan: &Plan) -> Result<(), PolicyViolation> {
        for (index, command) in plan.commands.iter().enumerate() {
            self.validate_command(index, command)?;
        }
        debug!(commands = plan.len(), "Plan passed policy");
        Ok(())
    }

    /// Validate one command at `index` in its plan
    pub fn validate_command(
        &self,
        index: usize,
        command: &PlannedCommand,
    ) -> Result<(), PolicyViolation> {
        let Some(program) = command.program() else {
            return Err(PolicyViolation::EmptyCommand { index });
        };

        for (arg, token) in command.argv.iter().enumerate() {
            if token.trim().is_empty() {
                return Err(PolicyViolation::EmptyArgument { index, arg });
            }
            if token.contains('\0') {
                return Err(PolicyViolation::NulByte { index, arg });
            }
        }

        if program.contains(SHELL_METACHARACTERS) {
            return Err(PolicyViolation::ShellMetacharacter {
                index,
                program: program.to_string(),
            });
        }

        let rendered = command.render();
        if let Some(pattern) = self.deny.iter().find(|re| re.is_match(&rendered)) {
            warn!(index, command = %rendered, pattern = %pattern, "Command blocked by denylist");
            return Err(PolicyViolation::Denied {
                index,
                command: rendered,
                pattern: pattern.as_str().to_string(),
            });
        }

        if !self.allow.is_empty() && !self.allow.iter().any(|re| re.is_match(&rendered)) {
            warn!(index, command = %rendered, "Command not permitted by allowlist");
            return Err(PolicyViolation::NotAllowed {
                index,
                command: rendered,
            });
        }

        Ok(())
    }
}

fn compile<I, S>(patterns: I, kind: &str) -> Vec<Regex>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .filter_map(|pattern| {
            let pattern = pattern.as_ref();
            match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(kind, pattern, error = %e, "Dropping invalid policy pattern");
                    None
                }
            }
        })
        .collect()
}
