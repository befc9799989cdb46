//! Expression nodes

use super::{NodeId, Type};
use serde::{Deserialize, Serialize};

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

/// Storage class of a named variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Storage {
    Local,
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Integer literal; `value` holds the raw bits truncated to the type width
    IntLit { value: u64, ty: Type },
    BoolLit(bool),

    /// Variable reference
    Var { name: String, ty: Type, storage: Storage },

    Unary { op: UnOp, operand: Box<Expr> },

    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Function call
    Call {
        callee: String,
        args: Vec<Expr>,
        ret: Type,
    },

    /// Assignment: target = value
    Assign { target: Box<Expr>, value: Box<Expr> },

    /// Pointer dereference `*ptr`
    Deref {
        ptr: Box<Expr>,
        ty: Type,
        volatile: bool,
    },

    /// Aggregate member access `base.field`
    Field {
        base: Box<Expr>,
        field: String,
        ty: Type,
    },

    /// Address-of `&expr`
    AddrOf(Box<Expr>),

    Cast { ty: Type, expr: Box<Expr> },
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    /// Logical not `!`
    Not,
    /// Arithmetic negation `-`
    Neg,
    /// Bitwise complement `~`
    BitNot,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::LogicalAnd | BinOp::LogicalOr)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::LogicalAnd => "&&",
            BinOp::LogicalOr => "||",
        }
    }
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
            UnOp::BitNot => "~",
        }
    }
}

impl Expr {
    pub fn new(id: NodeId, kind: ExprKind) -> Self {
        Self { id, kind }
    }

    /// Static type of the expression
    pub fn ty(&self) -> Type {
        match &self.kind {
            ExprKind::IntLit { ty, .. } => *ty,
            ExprKind::BoolLit(_) => Type::Bool,
            ExprKind::Var { ty, .. } => *ty,
            ExprKind::Unary { op: UnOp::Not, .. } => Type::Bool,
            ExprKind::Unary { operand, .. } => operand.ty().promote(),
            ExprKind::Binary { op, lhs, rhs } => {
                if op.is_comparison() || op.is_logical() {
                    Type::Bool
                } else if matches!(op, BinOp::Shl | BinOp::Shr) {
                    // the right operand does not take part in the result type
                    lhs.ty().promote()
                } else {
                    Type::common(lhs.ty(), rhs.ty())
                }
            }
            ExprKind::Call { ret, .. } => *ret,
            ExprKind::Assign { target, .. } => target.ty(),
            ExprKind::Deref { ty, .. } => *ty,
            ExprKind::Field { ty, .. } => *ty,
            ExprKind::AddrOf(_) => Type::Ptr,
            ExprKind::Cast { ty, .. } => *ty,
        }
    }

    /// Whether this is a literal that is true in a condition context
    pub fn is_true_literal(&self) -> bool {
        match &self.kind {
            ExprKind::BoolLit(b) => *b,
            ExprKind::IntLit { value, .. } => *value != 0,
            _ => false,
        }
    }

    /// Direct sub-expressions, in evaluation order
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::IntLit { .. } | ExprKind::BoolLit(_) | ExprKind::Var { .. } => Vec::new(),
            ExprKind::Unary { operand, .. } => vec![operand],
            ExprKind::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            ExprKind::Call { args, .. } => args.iter().collect(),
            ExprKind::Assign { target, value } => vec![target, value],
            ExprKind::Deref { ptr, .. } => vec![ptr],
            ExprKind::Field { base, .. } => vec![base],
            ExprKind::AddrOf(inner) => vec![inner],
            ExprKind::Cast { expr, .. } => vec![expr],
        }
    }

    /// Visit this expression and all of its descendants
    pub fn for_each<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        stacker::maybe_grow(super::STACK_RED_ZONE, super::STACK_GROW_SIZE, || {
            f(self);
            for child in self.children() {
                child.for_each(f);
            }
        })
    }
}
