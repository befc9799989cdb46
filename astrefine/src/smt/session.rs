//! Proof sessions
//!
//! A session is created at the start of a pass invocation and dropped when
//! it returns, on every path. It owns the translator (and with it every
//! declared symbol), the prover, and the solver time still available to the
//! invocation.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{FormulaTranslator, Prover, SmtError, SolverResult, Term};
use crate::ast::Expr;

/// Result of asking whether a formula always holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The formula holds in every state
    Proven,
    /// A counter-model exists
    Refuted,
    /// Unknown, timed out, budget exhausted or solver failure
    Undecided,
}

impl Verdict {
    pub fn is_proven(self) -> bool {
        self == Verdict::Proven
    }
}

/// Counters for one session
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub queries: usize,
    pub proven: usize,
    pub refuted: usize,
    pub undecided: usize,
    pub solver_time: Duration,
}

pub struct ProofSession {
    translator: FormulaTranslator,
    prover: Box<dyn Prover>,
    remaining: Duration,
    stats: SessionStats,
    solver_warned: bool,
}

impl ProofSession {
    pub fn new(prover: Box<dyn Prover>, budget: Duration) -> Self {
        Self {
            translator: FormulaTranslator::new(),
            prover,
            remaining: budget,
            stats: SessionStats::default(),
            solver_warned: false,
        }
    }

    /// Translate a branch condition
    pub fn condition(&mut self, expr: &Expr) -> Result<Term, SmtError> {
        self.translator.condition(expr)
    }

    /// Does `formula` hold in every state?
    pub fn prove_valid(&mut self, formula: &Term) -> Verdict {
        match self.check(&Term::not(formula)) {
            SolverResult::Unsat => Verdict::Proven,
            SolverResult::Sat => Verdict::Refuted,
            SolverResult::Unknown | SolverResult::Timeout => Verdict::Undecided,
        }
    }

    pub fn remaining_budget(&self) -> Duration {
        self.remaining
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    fn check(&mut self, assertion: &Term) -> SolverResult {
        self.stats.queries += 1;
        if self.remaining.is_zero() {
            debug!("solver budget exhausted, query skipped");
            self.stats.undecided += 1;
            return SolverResult::Timeout;
        }

        let script = self.translator.script(assertion);
        let start = Instant::now();
        let result = self.prover.check(&script, self.remaining);
        let elapsed = start.elapsed();
        self.remaining = self.remaining.saturating_sub(elapsed);
        self.stats.solver_time += elapsed;

        let result = match result {
            Ok(r) => r,
            Err(e) => {
                if !self.solver_warned {
                    warn!(prover = self.prover.name(), "solver failed, treating proofs as failed: {}", e);
                    self.solver_warned = true;
                }
                SolverResult::Unknown
            }
        };
        match result {
            SolverResult::Unsat => self.stats.proven += 1,
            SolverResult::Sat => self.stats.refuted += 1,
            SolverResult::Unknown | SolverResult::Timeout => self.stats.undecided += 1,
        }
        debug!(?result, ?elapsed, "proof query");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;
    use crate::smt::testing::ScriptedProver;
    use crate::smt::SmtSolver;

    #[test]
    fn test_valid_means_negation_unsat() {
        let prover = ScriptedProver::answering(&[SolverResult::Unsat, SolverResult::Sat]);
        let seen = prover.seen.clone();
        let mut session = ProofSession::new(Box::new(prover), Duration::from_secs(5));

        let mut b = AstBuilder::new();
        let e = b.eq_u32("x", 0);
        let c = session.condition(&e).unwrap();

        assert_eq!(session.prove_valid(&c), Verdict::Proven);
        assert_eq!(session.prove_valid(&c), Verdict::Refuted);
        assert!(seen.borrow()[0].contains("(assert (not (= |x| (_ bv0 32))))"));
        assert_eq!(session.stats().queries, 2);
        assert_eq!(session.stats().proven, 1);
        assert_eq!(session.stats().refuted, 1);
    }

    #[test]
    fn test_exhausted_budget_skips_solver() {
        let prover = ScriptedProver::answering(&[SolverResult::Unsat]);
        let watcher = prover.clone();
        let mut session = ProofSession::new(Box::new(prover), Duration::ZERO);

        assert_eq!(session.prove_valid(&Term::truth(true)), Verdict::Undecided);
        assert_eq!(watcher.queries(), 0);
        assert_eq!(session.stats().undecided, 1);
        assert!(session.remaining_budget().is_zero());
    }

    #[test]
    fn test_solver_failure_is_undecided() {
        let solver = SmtSolver::new().with_path("/nonexistent/solver");
        let mut session = ProofSession::new(Box::new(solver), Duration::from_secs(1));
        assert_eq!(session.prove_valid(&Term::truth(true)), Verdict::Undecided);
        assert_eq!(session.prove_valid(&Term::truth(true)), Verdict::Undecided);
        assert_eq!(session.stats().undecided, 2);
    }

    #[test]
    fn test_real_solver_proves_tautology() {
        let solver = SmtSolver::new();
        if !solver.is_available() {
            return;
        }
        let mut session = ProofSession::new(Box::new(solver), Duration::from_secs(10));
        let mut b = AstBuilder::new();
        let e = b.eq_u32("x", 0);
        let c = session.condition(&e).unwrap();
        let taut = Term::or(&[c.clone(), Term::not(&c)]);
        assert_eq!(session.prove_valid(&taut), Verdict::Proven);
        assert_eq!(session.prove_valid(&c), Verdict::Refuted);
    }
}
