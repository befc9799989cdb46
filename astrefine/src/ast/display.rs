//! C-like text rendering of trees
//!
//! Used for diagnostics, tests and the CLI. It is deliberately simple:
//! binary sub-expressions are always parenthesised and literals carry a
//! `U` suffix when unsigned.

use std::fmt::{self, Display, Formatter, Write};

use super::{Expr, ExprKind, Stmt, StmtKind, Tree, Type};

const INDENT: &str = "    ";

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::IntLit { value, ty } => write_int(f, *value, *ty),
            ExprKind::BoolLit(b) => write!(f, "{b}"),
            ExprKind::Var { name, .. } => write!(f, "{name}"),
            ExprKind::Unary { op, operand } => {
                write!(f, "{}", op.symbol())?;
                write_operand(f, operand)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                write_operand(f, lhs)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, rhs)
            }
            ExprKind::Call { callee, args, .. } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            ExprKind::Assign { target, value } => write!(f, "{target} = {value}"),
            ExprKind::Deref { ptr, .. } => {
                write!(f, "*")?;
                write_operand(f, ptr)
            }
            ExprKind::Field { base, field, .. } => {
                write_operand(f, base)?;
                write!(f, ".{field}")
            }
            ExprKind::AddrOf(inner) => {
                write!(f, "&")?;
                write_operand(f, inner)
            }
            ExprKind::Cast { ty, expr } => {
                write!(f, "({})", ty.c_name())?;
                write_operand(f, expr)
            }
        }
    }
}

fn write_int(f: &mut Formatter<'_>, value: u64, ty: Type) -> fmt::Result {
    match ty {
        // C has no literal narrower than `int`
        Type::Int { bits, signed } if bits > 0 && bits < 32 => {
            write!(f, "({})", ty.c_name())?;
            if signed {
                let shift = 64 - bits as u32;
                write!(f, "{}", ((value << shift) as i64) >> shift)
            } else {
                write!(f, "{value}")
            }
        }
        Type::Int { bits, signed: true } if bits < 64 && bits > 0 => {
            let shift = 64 - bits as u32;
            write!(f, "{}", ((value << shift) as i64) >> shift)
        }
        Type::Int { signed: true, .. } => write!(f, "{}", value as i64),
        Type::Int { signed: false, .. } => write!(f, "{value}U"),
        Type::Bool => write!(f, "{}", value != 0),
        _ => write!(f, "{value}"),
    }
}

fn write_operand(f: &mut Formatter<'_>, e: &Expr) -> fmt::Result {
    match e.kind {
        ExprKind::Binary { .. } | ExprKind::Assign { .. } | ExprKind::Cast { .. } => {
            write!(f, "({e})")
        }
        _ => write!(f, "{e}"),
    }
}

struct Printer<'a, 'b> {
    f: &'a mut Formatter<'b>,
}

impl Printer<'_, '_> {
    fn pad(&mut self, level: usize) -> fmt::Result {
        for _ in 0..level {
            self.f.write_str(INDENT)?;
        }
        Ok(())
    }

    /// Full statement on its own line(s), ending with a newline
    fn stmt(&mut self, s: &Stmt, level: usize) -> fmt::Result {
        self.pad(level)?;
        self.stmt_in_place(s, level)
    }

    /// Statement starting at the current column
    fn stmt_in_place(&mut self, s: &Stmt, level: usize) -> fmt::Result {
        match &s.kind {
            StmtKind::Compound(body) => {
                self.block(body, level)?;
                self.f.write_char('\n')
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                write!(self.f, "if ({cond})")?;
                let closed = self.branch(then_branch, level)?;
                match else_branch {
                    None => {
                        if closed {
                            self.f.write_char('\n')?;
                        }
                        Ok(())
                    }
                    Some(e) => {
                        if closed {
                            self.f.write_str(" else")?;
                        } else {
                            self.pad(level)?;
                            self.f.write_str("else")?;
                        }
                        if matches!(e.kind, StmtKind::If { .. }) {
                            self.f.write_char(' ')?;
                            self.stmt_in_place(e, level)
                        } else if self.branch(e, level)? {
                            self.f.write_char('\n')
                        } else {
                            Ok(())
                        }
                    }
                }
            }
            StmtKind::While { cond, body } => {
                write!(self.f, "while ({cond})")?;
                if self.branch(body, level)? {
                    self.f.write_char('\n')?;
                }
                Ok(())
            }
            StmtKind::DoWhile { body, cond } => {
                self.f.write_str("do")?;
                if !self.branch(body, level)? {
                    self.pad(level)?;
                } else {
                    self.f.write_char(' ')?;
                }
                writeln!(self.f, "while ({cond});")
            }
            StmtKind::Expr(e) => writeln!(self.f, "{e};"),
            StmtKind::Decl { name, ty, init } => match init {
                Some(init) => writeln!(self.f, "{} {name} = {init};", ty.c_name()),
                None => writeln!(self.f, "{} {name};", ty.c_name()),
            },
            StmtKind::Return(Some(e)) => writeln!(self.f, "return {e};"),
            StmtKind::Return(None) => writeln!(self.f, "return;"),
            StmtKind::Break => writeln!(self.f, "break;"),
            StmtKind::Continue => writeln!(self.f, "continue;"),
            StmtKind::Null => writeln!(self.f, ";"),
        }
    }

    /// Body of a control statement. Returns true when the body was a block
    /// left open on its closing brace (no newline written yet).
    fn branch(&mut self, s: &Stmt, level: usize) -> Result<bool, fmt::Error> {
        if let StmtKind::Compound(body) = &s.kind {
            self.f.write_char(' ')?;
            self.block(body, level)?;
            Ok(true)
        } else {
            self.f.write_char('\n')?;
            self.stmt(s, level + 1)?;
            Ok(false)
        }
    }

    fn block(&mut self, body: &[Stmt], level: usize) -> fmt::Result {
        self.f.write_str("{\n")?;
        for s in body {
            self.stmt(s, level + 1)?;
        }
        self.pad(level)?;
        self.f.write_char('}')
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Printer { f }.stmt(self, 0)
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "void {}(void) ", self.name)?;
        Printer { f }.stmt_in_place(&self.root, 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{AstBuilder, BinOp, Type};

    #[test]
    fn test_narrow_literals_are_cast() {
        let mut b = AstBuilder::new();
        let a = b.var("a", Type::u8());
        let one = b.lit(1, Type::u8());
        let sum = b.binary(BinOp::Add, a, one);
        let zero = b.lit(0, Type::u8());
        let eq = b.binary(BinOp::Eq, sum, zero);
        assert_eq!(eq.to_string(), "(a + (unsigned char)1) == (unsigned char)0");

        assert_eq!(b.lit(-1, Type::int(8, true)).to_string(), "(signed char)-1");
        assert_eq!(b.lit(7, Type::int(16, false)).to_string(), "(unsigned short)7");
        assert_eq!(b.uint(7).to_string(), "7U");
    }

    #[test]
    fn test_expression_rendering() {
        let mut b = AstBuilder::new();
        let x = b.eq_u32("x", 0);
        let y = b.var("y", Type::i32());
        let m1 = b.int(-1);
        let lt = b.binary(BinOp::Lt, y, m1);
        let or = b.binary(BinOp::LogicalOr, x, lt);
        let not = b.not(or);
        assert_eq!(not.to_string(), "!((x == 0U) || (y < -1))");
    }

    #[test]
    fn test_if_else_ladder_rendering() {
        let mut b = AstBuilder::new();
        let c0 = b.eq_u32("x", 0);
        let a = b.call_stmt("a");
        let then0 = b.compound(vec![a]);
        let c1 = b.eq_u32("x", 1);
        let bb = b.call_stmt("b");
        let then1 = b.compound(vec![bb]);
        let c = b.call_stmt("c");
        let last = b.compound(vec![c]);
        let inner = b.if_stmt(c1, then1, Some(last));
        let outer = b.if_stmt(c0, then0, Some(inner));
        let root = b.compound(vec![outer]);

        insta::assert_snapshot!(root.to_string(), @r"
        {
            if (x == 0U) {
                a();
            } else if (x == 1U) {
                b();
            } else {
                c();
            }
        }
        ");
    }

    #[test]
    fn test_loop_rendering() {
        let mut b = AstBuilder::new();
        let one = b.uint(1);
        let brk = b.break_stmt();
        let guard_cond = b.eq_u32("i", 10);
        let guard = b.if_stmt(guard_cond, brk, None);
        let step = b.call_stmt("step");
        let body = b.compound(vec![guard, step]);
        let lp = b.while_stmt(one, body);

        insta::assert_snapshot!(lp.to_string(), @r"
        while (1U) {
            if (i == 10U)
                break;
            step();
        }
        ");
    }

    #[test]
    fn test_do_while_with_declarations() {
        let mut b = AstBuilder::new();
        let p = b.var("p", Type::Ptr);
        let load = b.deref(p, Type::u32());
        let init = b.cast(Type::i64(), load);
        let decl = b.decl("v", Type::i64(), Some(init));
        let cont = b.continue_stmt();
        let body = b.compound(vec![decl, cont]);
        let s = b.var("s", Type::u32());
        let len = b.field(s, "len", Type::u32());
        let zero = b.uint(0);
        let cond = b.binary(BinOp::Ne, len, zero);
        let lp = b.do_while(body, cond);

        assert_eq!(
            lp.to_string(),
            "do {\n    long long v = (long long)*p;\n    continue;\n} while (s.len != 0U);\n"
        );
    }
}
