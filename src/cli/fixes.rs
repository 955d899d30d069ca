//! Static fix table used as the auto-retry planner
//!
//! The file maps a failing command's rendered line to the plan that fixes it:
//!
//! ```json
//! { "opkg install luci": { "commands": [{ "command": ["opkg", "update"] }] } }
//! ```

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use wrtpilot_core::FixPlanner;
use wrtpilot_exec::Plan;

/// [`FixPlanner`] answering from a JSON lookup table
#[derive(Debug, Clone, Default)]
pub struct FixTable {
    fixes: HashMap<String, Plan>,
}

impl FixTable {
    /// Load a fix table file
    pub fn load(path: &Path) -> Result<Self> {
        let input = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fix table {}", path.display()))?;
        Self::from_json(&input)
    }

    /// Parse a fix table
    pub fn from_json(input: &str) -> Result<Self> {
        let fixes = serde_json::from_str(input).context("Invalid fix table JSON")?;
        Ok(Self { fixes })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.fixes.len()
    }
}

#[async_trait::async_trait]
impl FixPlanner for FixTable {
    async fn generate_error_fix(
        &self,
        command: &str,
        _output: &str,
        attempt: u32,
    ) -> wrtpilot_core::Result<Plan> {
        let plan = self.fixes.get(command).cloned().unwrap_or_default();
        debug!(command, attempt, commands = plan.len(), "Fix table lookup");
        Ok(plan)
    }
}
