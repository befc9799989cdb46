//! Structural simplification passes
//!
//! Each pass implements [`TreePass`](crate::pass::TreePass) by walking the
//! tree with a [`StmtVisitor`](crate::pass::StmtVisitor) and proposing
//! substitutions; none of them mutates the tree directly.

mod dead_stmt;
mod loops;
mod reach;

pub use dead_stmt::*;
pub use loops::*;
pub use reach::*;
