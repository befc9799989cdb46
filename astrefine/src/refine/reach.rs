//! Reachability-based `if` chain refinement
//!
//! Lowering emits a run of sibling `if`s without `else` for every
//! multi-way branch. When their conditions are pairwise exclusive and
//! together cover every state, exactly one of the bodies runs, and the run
//! is rewritten as `if (c1) {..} else if (c2) {..} else {..}`.
//!
//! Both facts are proven with the SMT solver; anything short of a proof
//! (counter-model, `unknown`, timeout, solver failure) leaves the code as it
//! is.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info};

use crate::ast::{escaped_locals, Expr, Footprint, NodeId, Stmt, StmtKind};
use crate::error::Result;
use crate::pass::{walk, PassContext, PipelineConfig, Slot, StmtVisitor, TreePass, Walk};
use crate::smt::{ProofSession, Prover, SmtSolver, Term};

/// Builds the prover a pass invocation will own
pub type ProverFactory = Box<dyn Fn() -> Box<dyn Prover>>;

/// Reachability-based refinement pass
pub struct ReachRefine {
    new_prover: ProverFactory,
    budget: Duration,
}

impl ReachRefine {
    /// Pass backed by the solver executable and budget of `config`
    pub fn new(config: &PipelineConfig) -> Self {
        let path = config.solver_path.clone();
        Self::with_prover(
            move || Box::new(SmtSolver::new().with_path(&path)) as Box<dyn Prover>,
            config.solver_budget(),
        )
    }

    /// Pass using provers from `factory`, with `budget` of solver time per invocation
    pub fn with_prover(factory: impl Fn() -> Box<dyn Prover> + 'static, budget: Duration) -> Self {
        Self {
            new_prover: Box::new(factory),
            budget,
        }
    }
}

impl TreePass for ReachRefine {
    fn name(&self) -> &'static str {
        "reach_refine"
    }

    fn run(&mut self, root: &Stmt, cx: &mut PassContext<'_>) -> Result<()> {
        let mut finder = ChainFinder {
            session: ProofSession::new((self.new_prover)(), self.budget),
            escaped: escaped_locals(root),
            fused: 0,
        };
        walk(&mut finder, root, cx)?;

        let stats = finder.session.stats();
        if finder.fused > 0 {
            info!(
                chains = finder.fused,
                queries = stats.queries,
                solver_time = ?stats.solver_time,
                "fused if chains"
            );
        } else {
            debug!(queries = stats.queries, undecided = stats.undecided, "no if chain fused");
        }
        Ok(())
    }
}

/// One `if` of a candidate chain
struct Member<'a> {
    id: NodeId,
    cond: &'a Expr,
    then_branch: &'a Stmt,
}

/// Consecutive `if`s proven pairwise exclusive so far
#[derive(Default)]
struct Chain<'a> {
    /// Index of the first member in the enclosing block
    start: usize,
    members: Vec<Member<'a>>,
    conds: Vec<Term>,
    /// What the members' bodies may write
    writes: Footprint,
}

impl<'a> Chain<'a> {
    fn starting_at(start: usize) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    fn push(&mut self, member: Member<'a>, cond: Term, escaped: &HashSet<String>) {
        self.writes.merge(&Footprint::written_by(member.then_branch, escaped));
        self.members.push(member);
        self.conds.push(cond);
    }

    fn end(&self) -> usize {
        self.start + self.members.len()
    }

    /// Nested `if`/`else if` with the last member's body as the final `else`
    fn fuse(&self) -> Option<Stmt> {
        let (last, init) = self.members.split_last()?;
        let mut tail = last.then_branch.clone();
        for member in init.iter().rev() {
            tail = Stmt::new(
                member.id,
                StmtKind::If {
                    cond: member.cond.clone(),
                    then_branch: Box::new(member.then_branch.clone()),
                    else_branch: Some(Box::new(tail)),
                },
            );
        }
        Some(tail)
    }
}

struct ChainFinder {
    session: ProofSession,
    escaped: HashSet<String>,
    fused: usize,
}

impl ChainFinder {
    /// First fusable chain among the statements of a block
    fn find_chain<'a>(&mut self, body: &'a [Stmt], cx: &mut PassContext<'_>) -> Result<Option<Chain<'a>>> {
        let mut chain = Chain::default();

        for (i, stmt) in body.iter().enumerate() {
            let StmtKind::If {
                cond,
                then_branch,
                else_branch: None,
            } = &stmt.kind
            else {
                chain = Chain::starting_at(i + 1);
                continue;
            };
            cx.provenance().require(cx.pass_name(), stmt.id)?;
            if cx.stop_requested() {
                return Ok(None);
            }

            let term = match self.session.condition(cond) {
                Ok(term) => term,
                Err(e) => {
                    debug!(node = %stmt.id, "condition not translatable: {}", e);
                    chain = Chain::starting_at(i + 1);
                    continue;
                }
            };

            if Footprint::read_by(cond, &self.escaped).conflicts_with(&chain.writes) {
                debug!(node = %stmt.id, "condition reads state written by the chain");
                chain = Chain::starting_at(i);
            } else if !chain.members.is_empty() {
                let overlap = Term::and(&[term.clone(), Term::or(&chain.conds)]);
                if !self.session.prove_valid(&Term::not(&overlap)).is_proven() {
                    chain = Chain::starting_at(i);
                }
            }

            let member = Member {
                id: stmt.id,
                cond,
                then_branch: &**then_branch,
            };
            chain.push(member, term, &self.escaped);

            if chain.members.len() > 2 {
                if cx.stop_requested() {
                    return Ok(None);
                }
                if self.session.prove_valid(&Term::or(&chain.conds)).is_proven() {
                    return Ok(Some(chain));
                }
            }
        }
        Ok(None)
    }
}

impl StmtVisitor for ChainFinder {
    fn visit_compound(&mut self, stmt: &Stmt, body: &[Stmt], _slot: Slot, cx: &mut PassContext<'_>) -> Result<Walk> {
        let Some(chain) = self.find_chain(body, cx)? else {
            return Ok(Walk::Descend);
        };
        let Some(fused) = chain.fuse() else {
            return Ok(Walk::Descend);
        };
        debug!(block = %stmt.id, members = chain.members.len(), "fusing if chain");

        let mut new_body = Vec::with_capacity(body.len() - chain.members.len() + 1);
        new_body.extend_from_slice(&body[..chain.start]);
        new_body.push(fused);
        new_body.extend_from_slice(&body[chain.end()..]);

        cx.replace(stmt.id, Stmt::new(stmt.id, StmtKind::Compound(new_body)))?;
        self.fused += 1;
        Ok(Walk::Skip)
    }
}
