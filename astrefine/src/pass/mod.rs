//! Tree rewrite pass framework
//!
//! A pass reads the tree, never writes it: it proposes replacements into
//! the [`Substitutions`] ledger held by its [`PassContext`], and the
//! [`PassPipeline`] applies the ledger once the pass has returned. Passes
//! are driven to a fixed point.
//!
//! # Pass contract
//!
//! - `run` performs one traversal of the tree and only records proposals.
//! - A pass that replaces a node does not propose anything below it in the
//!   same invocation ([`Walk::Skip`]).
//! - Rewrites keep the ids of the nodes they rebuild; glue nodes get fresh
//!   ids from [`PassContext::fresh_id`].
//! - When a stop is requested the pass returns what it has proposed so far.

mod config;
mod ledger;
mod pipeline;

pub use config::*;
pub use ledger::*;
pub use pipeline::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ast::{NodeId, Stmt, StmtKind, STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::error::{RefineError, Result};
use crate::provenance::Provenance;

/// Cooperative stop request, shareable across threads
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a pass invocation may use besides the tree itself
pub struct PassContext<'a> {
    pass: &'static str,
    provenance: &'a Provenance,
    cancel: &'a CancelToken,
    next_id: Option<u32>,
    ledger: Substitutions,
}

impl<'a> PassContext<'a> {
    pub fn new(pass: &'static str, provenance: &'a Provenance, cancel: &'a CancelToken, next_id: Option<NodeId>) -> Self {
        Self {
            pass,
            provenance,
            cancel,
            next_id: next_id.map(|id| id.0),
            ledger: Substitutions::new(),
        }
    }

    pub fn pass_name(&self) -> &'static str {
        self.pass
    }

    pub fn provenance(&self) -> &'a Provenance {
        self.provenance
    }

    pub fn stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Id for a synthesized node
    pub fn fresh_id(&mut self) -> Result<NodeId> {
        let id = self.next_id.ok_or_else(|| RefineError::IdSpaceExhausted {
            pass: self.pass.to_string(),
        })?;
        self.next_id = id.checked_add(1);
        Ok(NodeId(id))
    }

    pub fn replace(&mut self, node: NodeId, with: Stmt) -> Result<()> {
        self.ledger.insert(node, Substitution::Replace(with))
    }

    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        self.ledger.insert(node, Substitution::Remove)
    }

    pub fn into_ledger(self) -> Substitutions {
        self.ledger
    }
}

/// A tree rewrite pass
pub trait TreePass {
    /// Name of the pass
    fn name(&self) -> &'static str;

    /// Traverse the tree once, recording proposed substitutions in `cx`
    fn run(&mut self, root: &Stmt, cx: &mut PassContext<'_>) -> Result<()>;
}

/// Where a statement sits in its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Function body
    Root,
    /// Element of a compound statement; may be dropped
    Block,
    /// `then` or `else` of an `if`; must hold a statement
    Branch,
    /// Loop body; must hold a statement
    LoopBody,
}

impl Slot {
    /// Whether removing the occupant leaves a hole that needs a `;`
    pub fn requires_statement(self) -> bool {
        !matches!(self, Slot::Block)
    }
}

/// Whether the walker should visit the children of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Descend,
    Skip,
}

/// Per-node-kind callbacks of a pass; the defaults just keep walking
pub trait StmtVisitor {
    fn visit_compound(&mut self, _stmt: &Stmt, _body: &[Stmt], _slot: Slot, _cx: &mut PassContext<'_>) -> Result<Walk> {
        Ok(Walk::Descend)
    }

    fn visit_if(&mut self, _stmt: &Stmt, _slot: Slot, _cx: &mut PassContext<'_>) -> Result<Walk> {
        Ok(Walk::Descend)
    }

    fn visit_while(&mut self, _stmt: &Stmt, _slot: Slot, _cx: &mut PassContext<'_>) -> Result<Walk> {
        Ok(Walk::Descend)
    }

    fn visit_do_while(&mut self, _stmt: &Stmt, _slot: Slot, _cx: &mut PassContext<'_>) -> Result<Walk> {
        Ok(Walk::Descend)
    }
}

/// Pre-order walk from the function root, honoring stop requests
pub fn walk<V: StmtVisitor + ?Sized>(visitor: &mut V, root: &Stmt, cx: &mut PassContext<'_>) -> Result<()> {
    walk_slot(visitor, root, Slot::Root, cx)
}

fn walk_slot<V: StmtVisitor + ?Sized>(visitor: &mut V, stmt: &Stmt, slot: Slot, cx: &mut PassContext<'_>) -> Result<()> {
    if cx.stop_requested() {
        return Ok(());
    }
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
        let step = match &stmt.kind {
            StmtKind::Compound(body) => visitor.visit_compound(stmt, body, slot, cx)?,
            StmtKind::If { .. } => visitor.visit_if(stmt, slot, cx)?,
            StmtKind::While { .. } => visitor.visit_while(stmt, slot, cx)?,
            StmtKind::DoWhile { .. } => visitor.visit_do_while(stmt, slot, cx)?,
            _ => Walk::Skip,
        };
        if step == Walk::Skip {
            return Ok(());
        }
        match &stmt.kind {
            StmtKind::Compound(body) => {
                for child in body {
                    walk_slot(visitor, child, Slot::Block, cx)?;
                }
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                walk_slot(visitor, then_branch, Slot::Branch, cx)?;
                if let Some(e) = else_branch {
                    walk_slot(visitor, e, Slot::Branch, cx)?;
                }
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
                walk_slot(visitor, body, Slot::LoopBody, cx)?;
            }
            _ => {}
        }
        Ok(())
    })
}
