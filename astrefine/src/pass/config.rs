//! Pipeline configuration
//!
//! The configuration is an explicit value handed to the driver when it is
//! built; nothing about pass behaviour is controlled by global state.
//!
//! ```toml
//! passes = ["dead_stmt_elim", "loop_refine", "reach_refine"]
//! max_rounds = 16
//! solver_timeout_ms = 30000
//! solver_path = "z3"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RefineError, Result};

/// Passes the pipeline knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    DeadStmtElim,
    LoopRefine,
    ReachRefine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Passes in the order a round runs them
    pub passes: Vec<PassKind>,
    /// Round cap of the fixed-point driver
    pub max_rounds: usize,
    /// Solver time available to one pass invocation, in milliseconds
    pub solver_timeout_ms: u64,
    /// Solver executable
    pub solver_path: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            passes: vec![PassKind::DeadStmtElim, PassKind::LoopRefine, PassKind::ReachRefine],
            max_rounds: 16,
            solver_timeout_ms: 30_000,
            solver_path: "z3".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| RefineError::io_error(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(RefineError::config("max_rounds must be at least 1"));
        }
        if self.solver_path.trim().is_empty() {
            return Err(RefineError::config("solver_path must not be empty"));
        }
        Ok(())
    }

    /// Set the pass order
    pub fn passes(mut self, passes: Vec<PassKind>) -> Self {
        self.passes = passes;
        self
    }

    /// Set the round cap
    pub fn max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Set the per-invocation solver budget
    pub fn solver_timeout(mut self, timeout: Duration) -> Self {
        self.solver_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn solver_path(mut self, path: &str) -> Self {
        self.solver_path = path.to_string();
        self
    }

    pub fn solver_budget(&self) -> Duration {
        Duration::from_millis(self.solver_timeout_ms)
    }
}
