//! Syntax tree of a decompiled function
//!
//! The tree is produced by the IR-to-AST lowering stage and then rewritten
//! in place by the refinement passes. Every statement and expression
//! carries a [`NodeId`] that is unique within its tree; the provenance map
//! and substitution ledgers refer to nodes by id.

mod builder;
mod display;
mod effects;
mod expr;
mod types;

pub use builder::*;
pub use effects::*;
pub use expr::*;
pub use types::*;

use serde::{Deserialize, Serialize};

use crate::error::{RefineError, Result};

/// Recursion on deep trees grows the stack instead of overflowing it
pub(crate) const STACK_RED_ZONE: usize = 64 * 1024;
pub(crate) const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Identity of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Statement node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// Block: { stmt1; stmt2; ... }
    Compound(Vec<Stmt>),

    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While { cond: Expr, body: Box<Stmt> },

    DoWhile { body: Box<Stmt>, cond: Expr },

    /// Expression statement
    Expr(Expr),

    /// Local declaration
    Decl {
        name: String,
        ty: Type,
        init: Option<Expr>,
    },

    Return(Option<Expr>),
    Break,
    Continue,

    /// Empty statement `;`
    Null,
}

impl Stmt {
    pub fn new(id: NodeId, kind: StmtKind) -> Self {
        Self { id, kind }
    }

    pub fn null(id: NodeId) -> Self {
        Self::new(id, StmtKind::Null)
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.kind, StmtKind::Compound(_))
    }

    /// Statement children, in source order
    pub fn child_stmts(&self) -> Vec<&Stmt> {
        match &self.kind {
            StmtKind::Compound(body) => body.iter().collect(),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                let mut out = vec![then_branch.as_ref()];
                if let Some(e) = else_branch {
                    out.push(e.as_ref());
                }
                out
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => vec![body.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Expressions owned directly by this statement
    pub fn child_exprs(&self) -> Vec<&Expr> {
        match &self.kind {
            StmtKind::If { cond, .. }
            | StmtKind::While { cond, .. }
            | StmtKind::DoWhile { cond, .. } => vec![cond],
            StmtKind::Expr(e) => vec![e],
            StmtKind::Decl { init: Some(e), .. } | StmtKind::Return(Some(e)) => vec![e],
            _ => Vec::new(),
        }
    }

    /// Visit this statement and every statement below it, pre-order
    pub fn for_each_stmt<'a>(&'a self, f: &mut dyn FnMut(&'a Stmt)) {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            f(self);
            for child in self.child_stmts() {
                child.for_each_stmt(f);
            }
        })
    }

    /// Visit every expression in this subtree, including nested ones
    pub fn for_each_expr<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        self.for_each_stmt(&mut |stmt| {
            for e in stmt.child_exprs() {
                e.for_each(f);
            }
        });
    }

    /// Every node id in this subtree, statements and expressions alike
    pub fn collect_ids(&self, out: &mut Vec<NodeId>) {
        self.for_each_stmt(&mut |stmt| {
            out.push(stmt.id);
            for e in stmt.child_exprs() {
                e.for_each(&mut |e| out.push(e.id));
            }
        });
    }

    /// Largest node id in this subtree
    pub fn max_id(&self) -> NodeId {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids.into_iter().max().unwrap_or(NodeId(0))
    }

    /// First id above every id of this subtree, `None` once the id space is used up
    pub fn next_free_id(&self) -> Option<NodeId> {
        self.max_id().0.checked_add(1).map(NodeId)
    }

    /// Fail on the first id shared by two nodes of this subtree
    pub fn check_unique_ids(&self) -> Result<()> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids.sort_unstable();
        match ids.windows(2).find(|w| w[0] == w[1]) {
            Some(w) => Err(RefineError::DuplicateNodeId { node: w[0] }),
            None => Ok(()),
        }
    }
}

/// Root of one decompiled function body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub name: String,
    pub root: Stmt,
}

impl Tree {
    pub fn new(name: impl Into<String>, root: Stmt) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    /// First id not used by any node of the tree
    pub fn next_free_id(&self) -> Option<NodeId> {
        self.root.next_free_id()
    }
}
