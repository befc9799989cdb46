//! Effect analysis over statements and expressions
//!
//! Answers the questions the passes ask before rewriting: can evaluating
//! this expression change program state, is this statement structurally
//! empty, and may running this statement change what that condition reads.

use std::collections::HashSet;

use super::{Expr, ExprKind, Stmt, StmtKind, Storage};

/// Whether evaluating the expression may change observable state
///
/// Calls, assignments and volatile accesses count as side effects.
pub fn has_side_effects(expr: &Expr) -> bool {
    let mut found = false;
    expr.for_each(&mut |e| {
        if matches!(
            e.kind,
            ExprKind::Call { .. } | ExprKind::Assign { .. } | ExprKind::Deref { volatile: true, .. }
        ) {
            found = true;
        }
    });
    found
}

/// `Null`, or a block whose statements are all structurally empty
pub fn is_structurally_empty(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Null => true,
        StmtKind::Compound(body) => body.iter().all(is_structurally_empty),
        _ => false,
    }
}

/// Locals whose address is taken somewhere in the subtree
pub fn escaped_locals(root: &Stmt) -> HashSet<String> {
    let mut out = HashSet::new();
    root.for_each_expr(&mut |e| {
        if let ExprKind::AddrOf(inner) = &e.kind
            && let Some(name) = base_var(inner)
        {
            out.insert(name.to_string());
        }
    });
    out
}

/// Variable an lvalue ultimately names, looking through member accesses
fn base_var(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Var { name, .. } => Some(name),
        ExprKind::Field { base, .. } => base_var(base),
        ExprKind::Cast { expr, .. } => base_var(expr),
        _ => None,
    }
}

/// Set of storage locations read or written by a piece of code.
///
/// `memory` stands for everything reachable through pointers or by callees:
/// globals, address-taken locals and dereferenced storage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Footprint {
    pub vars: HashSet<String>,
    pub memory: bool,
}

impl Footprint {
    /// Locations an expression reads
    pub fn read_by(expr: &Expr, escaped: &HashSet<String>) -> Self {
        let mut fp = Footprint::default();
        expr.for_each(&mut |e| match &e.kind {
            ExprKind::Var { name, storage, .. } => {
                fp.vars.insert(name.clone());
                if *storage == Storage::Global || escaped.contains(name) {
                    fp.memory = true;
                }
            }
            ExprKind::Deref { .. } | ExprKind::Call { .. } => fp.memory = true,
            _ => {}
        });
        fp
    }

    /// Locations a statement subtree may write
    pub fn written_by(stmt: &Stmt, escaped: &HashSet<String>) -> Self {
        let mut fp = Footprint::default();
        stmt.for_each_stmt(&mut |s| {
            if let StmtKind::Decl { name, .. } = &s.kind {
                fp.vars.insert(name.clone());
            }
        });
        stmt.for_each_expr(&mut |e| match &e.kind {
            ExprKind::Assign { target, .. } => match base_var(target) {
                Some(name) => {
                    fp.vars.insert(name.to_string());
                    if escaped.contains(name) || is_global_lvalue(target) {
                        fp.memory = true;
                    }
                }
                None => fp.memory = true,
            },
            ExprKind::Call { .. } => fp.memory = true,
            _ => {}
        });
        fp
    }

    pub fn conflicts_with(&self, other: &Footprint) -> bool {
        (self.memory && other.memory) || !self.vars.is_disjoint(&other.vars)
    }

    pub fn merge(&mut self, other: &Footprint) {
        self.vars.extend(other.vars.iter().cloned());
        self.memory |= other.memory;
    }
}

fn is_global_lvalue(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Var { storage, .. } => *storage == Storage::Global,
        ExprKind::Field { base, .. } => is_global_lvalue(base),
        ExprKind::Cast { expr, .. } => is_global_lvalue(expr),
        _ => false,
    }
}
