//! Convenience constructors for trees
//!
//! The builder hands out consecutive node ids and records a provenance entry
//! for every statement it creates, mirroring what the lowering stage
//! produces for a real function.

use super::{BinOp, Expr, ExprKind, NodeId, Stmt, StmtKind, Storage, Type, UnOp};
use crate::provenance::{IrOpcode, IrValue, Provenance};

#[derive(Debug, Default)]
pub struct AstBuilder {
    next: u32,
    provenance: Provenance,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue numbering after an existing tree
    pub fn starting_at(id: NodeId) -> Self {
        Self {
            next: id.0,
            provenance: Provenance::new(),
        }
    }

    pub fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    pub fn peek_next_id(&self) -> NodeId {
        NodeId(self.next)
    }

    /// Drop the provenance entry of a node (simulates a lowering bug)
    pub fn forget(&mut self, id: NodeId) {
        self.provenance.remove(id);
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn into_provenance(self) -> Provenance {
        self.provenance
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        let id = self.fresh_id();
        Expr::new(id, kind)
    }

    fn stmt(&mut self, kind: StmtKind) -> Stmt {
        let id = self.fresh_id();
        let opcode = match &kind {
            StmtKind::If { .. } | StmtKind::While { .. } | StmtKind::DoWhile { .. } => {
                IrOpcode::Br
            }
            StmtKind::Expr(e) => match &e.kind {
                ExprKind::Call { .. } => IrOpcode::Call,
                ExprKind::Assign { .. } => IrOpcode::Store,
                _ => IrOpcode::Other("expr".to_string()),
            },
            StmtKind::Decl { .. } => IrOpcode::Other("alloca".to_string()),
            StmtKind::Return(_) => IrOpcode::Other("ret".to_string()),
            StmtKind::Compound(_) => IrOpcode::Other("block".to_string()),
            StmtKind::Break | StmtKind::Continue | StmtKind::Null => IrOpcode::Br,
        };
        self.provenance
            .insert(id, IrValue::new(format!("%{}", id.0), opcode));
        Stmt::new(id, kind)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Local variable reference
    pub fn var(&mut self, name: &str, ty: Type) -> Expr {
        self.expr(ExprKind::Var {
            name: name.to_string(),
            ty,
            storage: Storage::Local,
        })
    }

    pub fn global(&mut self, name: &str, ty: Type) -> Expr {
        self.expr(ExprKind::Var {
            name: name.to_string(),
            ty,
            storage: Storage::Global,
        })
    }

    /// Literal of an arbitrary integer type; the value is truncated to its width
    pub fn lit(&mut self, value: i128, ty: Type) -> Expr {
        let bits = ty.bit_width().unwrap_or(64);
        let raw = value as u128 as u64;
        let value = if bits >= 64 { raw } else { raw & ((1u64 << bits) - 1) };
        self.expr(ExprKind::IntLit { value, ty })
    }

    /// `unsigned int` literal
    pub fn uint(&mut self, value: u32) -> Expr {
        self.lit(value as i128, Type::u32())
    }

    /// `int` literal
    pub fn int(&mut self, value: i32) -> Expr {
        self.lit(value as i128, Type::i32())
    }

    pub fn bool_lit(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::BoolLit(value))
    }

    pub fn unary(&mut self, op: UnOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn not(&mut self, operand: Expr) -> Expr {
        self.unary(UnOp::Not, operand)
    }

    pub fn binary(&mut self, op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// `name == value` over an unsigned 32-bit local
    pub fn eq_u32(&mut self, name: &str, value: u32) -> Expr {
        let v = self.var(name, Type::u32());
        let c = self.uint(value);
        self.binary(BinOp::Eq, v, c)
    }

    pub fn call(&mut self, callee: &str, args: Vec<Expr>, ret: Type) -> Expr {
        self.expr(ExprKind::Call {
            callee: callee.to_string(),
            args,
            ret,
        })
    }

    pub fn assign(&mut self, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    pub fn deref(&mut self, ptr: Expr, ty: Type) -> Expr {
        self.expr(ExprKind::Deref {
            ptr: Box::new(ptr),
            ty,
            volatile: false,
        })
    }

    pub fn volatile_deref(&mut self, ptr: Expr, ty: Type) -> Expr {
        self.expr(ExprKind::Deref {
            ptr: Box::new(ptr),
            ty,
            volatile: true,
        })
    }

    pub fn field(&mut self, base: Expr, field: &str, ty: Type) -> Expr {
        self.expr(ExprKind::Field {
            base: Box::new(base),
            field: field.to_string(),
            ty,
        })
    }

    pub fn addr_of(&mut self, inner: Expr) -> Expr {
        self.expr(ExprKind::AddrOf(Box::new(inner)))
    }

    pub fn cast(&mut self, ty: Type, inner: Expr) -> Expr {
        self.expr(ExprKind::Cast {
            ty,
            expr: Box::new(inner),
        })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub fn compound(&mut self, body: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::Compound(body))
    }

    pub fn if_stmt(&mut self, cond: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Stmt {
        self.stmt(StmtKind::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        })
    }

    pub fn while_stmt(&mut self, cond: Expr, body: Stmt) -> Stmt {
        self.stmt(StmtKind::While {
            cond,
            body: Box::new(body),
        })
    }

    pub fn do_while(&mut self, body: Stmt, cond: Expr) -> Stmt {
        self.stmt(StmtKind::DoWhile {
            body: Box::new(body),
            cond,
        })
    }

    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    /// `callee();` as a statement
    pub fn call_stmt(&mut self, callee: &str) -> Stmt {
        let call = self.call(callee, Vec::new(), Type::Void);
        self.expr_stmt(call)
    }

    pub fn decl(&mut self, name: &str, ty: Type, init: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Decl {
            name: name.to_string(),
            ty,
            init,
        })
    }

    pub fn ret(&mut self, value: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Return(value))
    }

    pub fn break_stmt(&mut self) -> Stmt {
        self.stmt(StmtKind::Break)
    }

    pub fn continue_stmt(&mut self) -> Stmt {
        self.stmt(StmtKind::Continue)
    }

    pub fn null(&mut self) -> Stmt {
        self.stmt(StmtKind::Null)
    }
}
