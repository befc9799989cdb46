//! Fixed-point pass driver

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::{CancelToken, PassContext, PassKind, PipelineConfig, TreePass};
use crate::ast::Tree;
use crate::error::Result;
use crate::provenance::Provenance;
use crate::refine::{DeadStmtElim, LoopRefine, ReachRefine};

/// Runs passes in order, round after round, until a round changes nothing
pub struct PassPipeline {
    passes: Vec<Box<dyn TreePass>>,
    max_rounds: usize,
    cancel: CancelToken,
}

impl PassPipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            max_rounds: PipelineConfig::default().max_rounds,
            cancel: CancelToken::new(),
        }
    }

    /// Build the passes named by `config`, in its order
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut pipeline = Self::new();
        pipeline.set_max_rounds(config.max_rounds);
        for kind in &config.passes {
            let pass: Box<dyn TreePass> = match kind {
                PassKind::DeadStmtElim => Box::new(DeadStmtElim),
                PassKind::LoopRefine => Box::new(LoopRefine),
                PassKind::ReachRefine => Box::new(ReachRefine::new(config)),
            };
            pipeline.add_pass(pass);
        }
        pipeline
    }

    /// Add a pass at the end of the round
    pub fn add_pass(&mut self, pass: Box<dyn TreePass>) {
        self.passes.push(pass);
    }

    /// Set the round cap
    pub fn set_max_rounds(&mut self, n: usize) {
        self.max_rounds = n;
    }

    /// Use an externally owned stop signal
    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = token;
    }

    /// Handle through which a caller can request a stop
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Simplify `tree` in place.
    ///
    /// Errors come only from broken invariants and abort the whole run; the
    /// tree may then hold the rewrites of the rounds that completed.
    pub fn run(&mut self, tree: &mut Tree, provenance: &Provenance) -> Result<PipelineStats> {
        tree.root.check_unique_ids()?;
        let mut stats = PipelineStats::new();

        'rounds: for round in 1..=self.max_rounds {
            let mut changes = 0;
            stats.rounds = round;

            for pass in &mut self.passes {
                if self.cancel.is_cancelled() {
                    stats.cancelled = true;
                    break 'rounds;
                }

                let mut cx = PassContext::new(pass.name(), provenance, &self.cancel, tree.next_free_id());
                pass.run(&tree.root, &mut cx)?;
                let applied = cx.into_ledger().apply(&mut tree.root)?;

                debug!(pass = pass.name(), round, applied, "pass finished");
                stats.record_pass(pass.name(), applied);
                changes += applied;
            }

            if changes == 0 {
                stats.converged = true;
                break;
            }
        }

        if self.cancel.is_cancelled() {
            stats.cancelled = true;
        }
        if !stats.converged && !stats.cancelled {
            warn!(
                function = %tree.name,
                rounds = stats.rounds,
                "simplification did not converge within the round cap"
            );
        }
        info!(
            function = %tree.name,
            rounds = stats.rounds,
            substitutions = stats.substitutions,
            converged = stats.converged,
            "refinement finished"
        );
        Ok(stats)
    }
}

impl Default for PassPipeline {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Statistics from one pipeline run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    /// Number of rounds started
    pub rounds: usize,
    /// A full round made no substitution
    pub converged: bool,
    /// A stop was requested before convergence
    pub cancelled: bool,
    /// Substitutions applied in total
    pub substitutions: usize,
    /// Substitutions applied, per pass
    pub pass_counts: BTreeMap<String, usize>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&mut self, name: &str, applied: usize) {
        *self.pass_counts.entry(name.to_string()).or_insert(0) += applied;
        self.substitutions += applied;
    }

    pub fn count(&self, name: &str) -> usize {
        self.pass_counts.get(name).copied().unwrap_or(0)
    }
}
