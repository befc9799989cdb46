//! Loop condition recovery
//!
//! Lowering turns every loop into `while (1)` with an explicit exit test.
//! When that test leads the body,
//!
//! ```c
//! while (1) { if (c) break; rest; }
//! ```
//!
//! it becomes the loop condition: `while (!c) { rest; }`.

use tracing::debug;

use crate::ast::{Expr, ExprKind, Stmt, StmtKind, UnOp};
use crate::error::Result;
use crate::pass::{walk, PassContext, Slot, StmtVisitor, TreePass, Walk};

/// Loop refinement pass
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopRefine;

impl TreePass for LoopRefine {
    fn name(&self) -> &'static str {
        "loop_refine"
    }

    fn run(&mut self, root: &Stmt, cx: &mut PassContext<'_>) -> Result<()> {
        walk(self, root, cx)
    }
}

/// Condition of a `if (c) break;` statement
fn exit_guard(stmt: &Stmt) -> Option<&Expr> {
    let StmtKind::If {
        cond,
        then_branch,
        else_branch: None,
    } = &stmt.kind
    else {
        return None;
    };
    let breaks = match &then_branch.kind {
        StmtKind::Break => true,
        StmtKind::Compound(body) => matches!(body.as_slice(), [Stmt { kind: StmtKind::Break, .. }]),
        _ => false,
    };
    breaks.then_some(cond)
}

/// `!cond`, folding an existing negation
fn negate(cond: &Expr, cx: &mut PassContext<'_>) -> Result<Expr> {
    Ok(match &cond.kind {
        ExprKind::Unary { op: UnOp::Not, operand } => (**operand).clone(),
        _ => Expr::new(
            cx.fresh_id()?,
            ExprKind::Unary {
                op: UnOp::Not,
                operand: Box::new(cond.clone()),
            },
        ),
    })
}

impl StmtVisitor for LoopRefine {
    fn visit_while(&mut self, stmt: &Stmt, _slot: Slot, cx: &mut PassContext<'_>) -> Result<Walk> {
        let StmtKind::While { cond, body } = &stmt.kind else {
            return Ok(Walk::Descend);
        };
        if !cond.is_true_literal() {
            return Ok(Walk::Descend);
        }

        let (first, rest) = match &body.kind {
            StmtKind::Compound(stmts) => match stmts.split_first() {
                Some((first, rest)) => (first, rest),
                None => return Ok(Walk::Descend),
            },
            _ => (&**body, &[][..]),
        };
        let Some(exit) = exit_guard(first) else {
            return Ok(Walk::Descend);
        };

        let origin = cx.provenance().require(cx.pass_name(), stmt.id)?;
        debug!(node = %stmt.id, origin = %origin, "loop exit test becomes loop condition");

        let new_cond = negate(exit, cx)?;
        let new_body = if body.is_compound() {
            Stmt::new(body.id, StmtKind::Compound(rest.to_vec()))
        } else {
            Stmt::new(cx.fresh_id()?, StmtKind::Compound(Vec::new()))
        };
        let refined = Stmt::new(
            stmt.id,
            StmtKind::While {
                cond: new_cond,
                body: Box::new(new_body),
            },
        );
        cx.replace(stmt.id, refined)?;
        Ok(Walk::Skip)
    }
}
