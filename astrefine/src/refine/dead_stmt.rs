//! Dead statement elimination
//!
//! Removes statements that can never do anything: `;`, blocks holding
//! nothing but other empty blocks, and `if`s with a pure condition and empty
//! branches. Purely syntactic.

use tracing::debug;

use crate::ast::{has_side_effects, is_structurally_empty, Stmt, StmtKind};
use crate::error::Result;
use crate::pass::{walk, PassContext, Slot, StmtVisitor, TreePass, Walk};

/// Dead statement elimination pass
#[derive(Debug, Default, Clone, Copy)]
pub struct DeadStmtElim;

impl TreePass for DeadStmtElim {
    fn name(&self) -> &'static str {
        "dead_stmt_elim"
    }

    fn run(&mut self, root: &Stmt, cx: &mut PassContext<'_>) -> Result<()> {
        walk(self, root, cx)
    }
}

/// An `if` that can be dropped without changing behaviour
pub fn is_dead_if(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            !has_side_effects(cond)
                && is_structurally_empty(then_branch)
                && else_branch.as_deref().is_none_or(is_structurally_empty)
        }
        _ => false,
    }
}

fn is_dead(stmt: &Stmt) -> bool {
    is_structurally_empty(stmt) || is_dead_if(stmt)
}

impl StmtVisitor for DeadStmtElim {
    fn visit_compound(&mut self, stmt: &Stmt, body: &[Stmt], slot: Slot, cx: &mut PassContext<'_>) -> Result<Walk> {
        if !body.iter().any(is_dead) {
            return Ok(Walk::Descend);
        }

        let survivors: Vec<Stmt> = body.iter().filter(|s| !is_dead(s)).cloned().collect();
        debug!(
            block = %stmt.id,
            removed = body.len() - survivors.len(),
            "dropping dead statements"
        );

        let replacement = if survivors.is_empty() && slot.requires_statement() && slot != Slot::Root {
            Stmt::null(stmt.id)
        } else {
            Stmt::new(stmt.id, StmtKind::Compound(survivors))
        };
        cx.replace(stmt.id, replacement)?;
        Ok(Walk::Skip)
    }

    fn visit_if(&mut self, stmt: &Stmt, slot: Slot, cx: &mut PassContext<'_>) -> Result<Walk> {
        // Dead ifs inside blocks are dropped by the enclosing block
        if slot.requires_statement() && is_dead_if(stmt) {
            debug!(node = %stmt.id, "dead if in branch position");
            cx.remove(stmt.id)?;
            return Ok(Walk::Skip);
        }
        Ok(Walk::Descend)
    }
}
