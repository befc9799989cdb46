//! Tree expression to SMT-LIB2 translation
//!
//! Integers become bit-vectors of their declared width. Operators work at
//! the width of the promoted operand types, so narrow operands are extended
//! to `int` first; signedness picks the signed or unsigned flavour of
//! division, remainder, right shift and ordering. Memory reads (`*p`, `s.f`, `&x`) become opaque constants keyed
//! by their rendered text, so the same read in two conditions denotes the
//! same value. Calls, assignments and volatile accesses are rejected.

use std::collections::{BTreeMap, HashMap};

use super::{quote_symbol, SmtError, SmtSort, Term};
use crate::ast::{BinOp, Expr, ExprKind, NodeId, Storage, Type, UnOp, STACK_GROW_SIZE, STACK_RED_ZONE};

/// Translator with its own symbol table; one per proof session
#[derive(Debug, Default)]
pub struct FormulaTranslator {
    /// Declared constants, by symbol
    declarations: BTreeMap<String, SmtSort>,
    /// Opaque memory reads: rendered expression -> symbol
    opaque: HashMap<String, String>,
    /// Already translated nodes
    memo: HashMap<NodeId, Term>,
}

impl FormulaTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate an expression used as a condition (result sort is `Bool`)
    pub fn condition(&mut self, expr: &Expr) -> Result<Term, SmtError> {
        let t = self.translate(expr)?;
        Ok(bool_cast(&t))
    }

    /// Translate an expression, reusing earlier translations of the same node
    pub fn translate(&mut self, expr: &Expr) -> Result<Term, SmtError> {
        if let Some(t) = self.memo.get(&expr.id) {
            return Ok(t.clone());
        }
        let t = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.translate_inner(expr))?;
        self.memo.insert(expr.id, t.clone());
        Ok(t)
    }

    pub fn memoized(&self) -> usize {
        self.memo.len()
    }

    /// SMT-LIB2 script asserting `formula` and asking for satisfiability
    pub fn script(&self, formula: &Term) -> String {
        let mut output = String::new();
        output.push_str("(set-logic QF_BV)\n");
        for (symbol, sort) in &self.declarations {
            output.push_str(&format!("(declare-const {} {})\n", symbol, sort.to_smt()));
        }
        output.push_str(&format!("(assert {})\n", formula.text));
        output.push_str("(check-sat)\n");
        output
    }

    fn translate_inner(&mut self, expr: &Expr) -> Result<Term, SmtError> {
        match &expr.kind {
            ExprKind::IntLit { value, ty } => match ty {
                Type::Bool => Ok(Term::truth(*value != 0)),
                _ => {
                    let w = width_of(*ty)?;
                    Ok(bv_lit(*value, w))
                }
            },

            ExprKind::BoolLit(b) => Ok(Term::truth(*b)),

            ExprKind::Var { name, ty, storage } => {
                let symbol = match storage {
                    Storage::Local => quote_symbol(name),
                    Storage::Global => quote_symbol(&format!("@{}", name)),
                };
                self.declare(&symbol, sort_of(*ty)?)
            }

            ExprKind::Unary { op, operand } => {
                let inner = self.translate(operand)?;
                match op {
                    UnOp::Not => Ok(Term::not(&bool_cast(&inner))),
                    UnOp::Neg | UnOp::BitNot => {
                        let ty = expr.ty();
                        let v = resize(&inner, operand.ty(), width_of(ty)?);
                        let f = if *op == UnOp::Neg { "bvneg" } else { "bvnot" };
                        Ok(Term::new(format!("({} {})", f, v.text), v.sort))
                    }
                }
            }

            ExprKind::Binary { op, lhs, rhs } => self.translate_binary(expr, *op, lhs, rhs),

            ExprKind::Cast { ty, expr: inner } => {
                let t = self.translate(inner)?;
                match ty {
                    Type::Bool => Ok(bool_cast(&t)),
                    Type::Void => Err(SmtError::UnsupportedType("void".to_string())),
                    _ => Ok(resize(&t, inner.ty(), width_of(*ty)?)),
                }
            }

            ExprKind::Deref { volatile: true, .. } => Err(SmtError::UnsupportedExpression(format!(
                "volatile access `{}`",
                expr
            ))),

            ExprKind::Deref { ty, .. } | ExprKind::Field { ty, .. } => {
                self.opaque_read(expr, sort_of(*ty)?)
            }

            ExprKind::AddrOf(_) => self.opaque_read(expr, SmtSort::BitVec(64)),

            ExprKind::Call { callee, .. } => Err(SmtError::UnsupportedExpression(format!(
                "call to `{}`",
                callee
            ))),

            ExprKind::Assign { .. } => Err(SmtError::UnsupportedExpression(format!(
                "assignment `{}`",
                expr
            ))),
        }
    }

    fn translate_binary(&mut self, expr: &Expr, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Term, SmtError> {
        let l = self.translate(lhs)?;
        let r = self.translate(rhs)?;

        if op.is_logical() {
            let f = if op == BinOp::LogicalAnd { "and" } else { "or" };
            return Ok(Term::bool(format!("({} {} {})", f, bool_cast(&l).text, bool_cast(&r).text)));
        }

        if op.is_comparison() {
            if l.sort == SmtSort::Bool && r.sort == SmtSort::Bool && matches!(op, BinOp::Eq | BinOp::Ne) {
                return Ok(compare_eq(op, &l, &r));
            }
            let common = Type::common(lhs.ty(), rhs.ty());
            let w = width_of(common)?;
            let l = resize(&l, lhs.ty(), w);
            let r = resize(&r, rhs.ty(), w);
            let f = match (op, common.is_signed()) {
                (BinOp::Eq | BinOp::Ne, _) => return Ok(compare_eq(op, &l, &r)),
                (BinOp::Lt, true) => "bvslt",
                (BinOp::Lt, false) => "bvult",
                (BinOp::Le, true) => "bvsle",
                (BinOp::Le, false) => "bvule",
                (BinOp::Gt, true) => "bvsgt",
                (BinOp::Gt, false) => "bvugt",
                (BinOp::Ge, true) => "bvsge",
                (BinOp::Ge, false) => "bvuge",
                _ => return Err(SmtError::UnsupportedOperator(op.symbol().to_string())),
            };
            return Ok(Term::bool(format!("({} {} {})", f, l.text, r.text)));
        }

        let ty = expr.ty();
        let w = width_of(ty)?;
        let signed = ty.is_signed();
        let l = resize(&l, lhs.ty(), w);
        let r = resize(&r, rhs.ty(), w);
        let f = match op {
            BinOp::Add => "bvadd",
            BinOp::Sub => "bvsub",
            BinOp::Mul => "bvmul",
            BinOp::Div if signed => "bvsdiv",
            BinOp::Div => "bvudiv",
            BinOp::Rem if signed => "bvsrem",
            BinOp::Rem => "bvurem",
            BinOp::BitAnd => "bvand",
            BinOp::BitOr => "bvor",
            BinOp::BitXor => "bvxor",
            BinOp::Shl => "bvshl",
            BinOp::Shr if signed => "bvashr",
            BinOp::Shr => "bvlshr",
            _ => return Err(SmtError::UnsupportedOperator(op.symbol().to_string())),
        };
        Ok(Term::new(format!("({} {} {})", f, l.text, r.text), SmtSort::BitVec(w)))
    }

    fn declare(&mut self, symbol: &str, sort: SmtSort) -> Result<Term, SmtError> {
        match self.declarations.get(symbol) {
            Some(existing) if *existing != sort => Err(SmtError::UnsupportedType(format!(
                "{} used as both {} and {}",
                symbol,
                existing.to_smt(),
                sort.to_smt()
            ))),
            Some(_) => Ok(Term::new(symbol, sort)),
            None => {
                self.declarations.insert(symbol.to_string(), sort);
                Ok(Term::new(symbol, sort))
            }
        }
    }

    fn opaque_read(&mut self, expr: &Expr, sort: SmtSort) -> Result<Term, SmtError> {
        let key = format!("{}:{}", expr, sort.to_smt());
        let next = self.opaque.len();
        let symbol = self
            .opaque
            .entry(key)
            .or_insert_with(|| format!("|mem!{}|", next))
            .clone();
        self.declare(&symbol, sort)
    }
}

fn sort_of(ty: Type) -> Result<SmtSort, SmtError> {
    match ty {
        Type::Bool => Ok(SmtSort::Bool),
        _ => Ok(SmtSort::BitVec(width_of(ty)?)),
    }
}

fn width_of(ty: Type) -> Result<u16, SmtError> {
    match ty {
        // Booleans take part in arithmetic as `int`
        Type::Bool => Ok(32),
        Type::Int { bits: 0, .. } => Err(SmtError::UnsupportedType("zero-width integer".to_string())),
        _ => ty
            .bit_width()
            .ok_or_else(|| SmtError::UnsupportedType(ty.c_name())),
    }
}

fn bv_lit(value: u64, width: u16) -> Term {
    let value = if width >= 64 { value } else { value & ((1u64 << width) - 1) };
    Term::new(format!("(_ bv{} {})", value, width), SmtSort::BitVec(width))
}

/// Interpret a term as a C truth value
pub fn bool_cast(t: &Term) -> Term {
    match t.sort {
        SmtSort::Bool => t.clone(),
        SmtSort::BitVec(w) => Term::bool(format!("(not (= {} {}))", t.text, bv_lit(0, w).text)),
    }
}

fn compare_eq(op: BinOp, l: &Term, r: &Term) -> Term {
    let eq = Term::bool(format!("(= {} {})", l.text, r.text));
    if op == BinOp::Ne { Term::not(&eq) } else { eq }
}

/// Convert a term of type `from` to a bit-vector of `width` bits
fn resize(t: &Term, from: Type, width: u16) -> Term {
    let t = match t.sort {
        SmtSort::Bool => Term::new(
            format!("(ite {} {} {})", t.text, bv_lit(1, width).text, bv_lit(0, width).text),
            SmtSort::BitVec(width),
        ),
        SmtSort::BitVec(_) => t.clone(),
    };
    let SmtSort::BitVec(current) = t.sort else {
        return t;
    };
    if current == width {
        t
    } else if current < width {
        let ext = if from.is_signed() { "sign_extend" } else { "zero_extend" };
        Term::new(
            format!("((_ {} {}) {})", ext, width - current, t.text),
            SmtSort::BitVec(width),
        )
    } else {
        Term::new(
            format!("((_ extract {} 0) {})", width - 1, t.text),
            SmtSort::BitVec(width),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;

    #[test]
    fn test_equality_over_unsigned() {
        let mut b = AstBuilder::new();
        let e = b.eq_u32("x", 1);
        let mut tr = FormulaTranslator::new();
        let t = tr.condition(&e).unwrap();
        assert_eq!(t.text, "(= |x| (_ bv1 32))");
        assert_eq!(t.sort, SmtSort::Bool);
        let script = tr.script(&t);
        assert!(script.contains("(declare-const |x| (_ BitVec 32))"));
        assert!(script.ends_with("(check-sat)\n"));
    }

    #[test]
    fn test_signedness_selects_comparison() {
        let mut b = AstBuilder::new();
        let x = b.var("x", Type::i32());
        let zero = b.int(0);
        let lt = b.binary(BinOp::Lt, x, zero);
        let mut tr = FormulaTranslator::new();
        assert_eq!(tr.condition(&lt).unwrap().text, "(bvslt |x| (_ bv0 32))");

        let y = b.var("y", Type::u32());
        let zero = b.int(0);
        let ge = b.binary(BinOp::Ge, y, zero);
        // int converts to unsigned int
        assert_eq!(tr.condition(&ge).unwrap().text, "(bvuge |y| (_ bv0 32))");
    }

    #[test]
    fn test_integer_condition_is_cast_to_bool() {
        let mut b = AstBuilder::new();
        let x = b.var("flags", Type::u8());
        let mut tr = FormulaTranslator::new();
        assert_eq!(tr.condition(&x).unwrap().text, "(not (= |flags| (_ bv0 8)))");
    }

    #[test]
    fn test_mixed_width_extends() {
        let mut b = AstBuilder::new();
        let small = b.var("c", Type::int(8, true));
        let big = b.var("n", Type::i64());
        let eq = b.binary(BinOp::Eq, small, big);
        let mut tr = FormulaTranslator::new();
        assert_eq!(tr.condition(&eq).unwrap().text, "(= ((_ sign_extend 56) |c|) |n|)");
    }

    #[test]
    fn test_narrow_arithmetic_is_done_in_int() {
        let mut b = AstBuilder::new();
        let a = b.var("a", Type::u8());
        let one = b.lit(1, Type::u8());
        let sum = b.binary(BinOp::Add, a, one);
        assert_eq!(sum.ty(), Type::i32());
        let zero = b.lit(0, Type::u8());
        let wraps = b.binary(BinOp::Eq, sum, zero);

        let mut tr = FormulaTranslator::new();
        assert_eq!(
            tr.condition(&wraps).unwrap().text,
            "(= (bvadd ((_ zero_extend 24) |a|) ((_ zero_extend 24) (_ bv1 8))) ((_ zero_extend 24) (_ bv0 8)))"
        );
        let script = tr.script(&Term::truth(true));
        assert!(script.contains("(declare-const |a| (_ BitVec 8))"));
    }

    #[test]
    fn test_mixed_signedness_narrow_compare_is_signed() {
        let mut b = AstBuilder::new();
        let c = b.var("c", Type::int(8, true));
        let d = b.var("d", Type::u8());
        let lt = b.binary(BinOp::Lt, c, d);
        let mut tr = FormulaTranslator::new();
        assert_eq!(
            tr.condition(&lt).unwrap().text,
            "(bvslt ((_ sign_extend 24) |c|) ((_ zero_extend 24) |d|))"
        );
    }

    #[test]
    fn test_narrow_unary_and_shift_promote() {
        let mut b = AstBuilder::new();
        let a = b.var("a", Type::u8());
        let inv = b.unary(UnOp::BitNot, a);
        assert_eq!(inv.ty(), Type::i32());
        let a = b.var("a", Type::u8());
        let neg = b.unary(UnOp::Neg, a);
        let h = b.var("h", Type::int(16, false));
        let n = b.var("n", Type::u32());
        let shl = b.binary(BinOp::Shl, h, n);
        assert_eq!(shl.ty(), Type::i32());

        let mut tr = FormulaTranslator::new();
        assert_eq!(tr.translate(&inv).unwrap().text, "(bvnot ((_ zero_extend 24) |a|))");
        assert_eq!(tr.translate(&neg).unwrap().text, "(bvneg ((_ zero_extend 24) |a|))");
        assert_eq!(tr.translate(&shl).unwrap().text, "(bvshl ((_ zero_extend 16) |h|) |n|)");
    }

    #[test]
    fn test_memory_reads_are_shared_symbols() {
        let mut b = AstBuilder::new();
        let p1 = b.var("p", Type::Ptr);
        let d1 = b.deref(p1, Type::u32());
        let p2 = b.var("p", Type::Ptr);
        let d2 = b.deref(p2, Type::u32());
        let mut tr = FormulaTranslator::new();
        let t1 = tr.translate(&d1).unwrap();
        let t2 = tr.translate(&d2).unwrap();
        assert_eq!(t1, t2);
        assert_eq!(t1.text, "|mem!0|");
    }

    #[test]
    fn test_rejects_calls_and_volatile() {
        let mut b = AstBuilder::new();
        let call = b.call("f", vec![], Type::i32());
        let mut tr = FormulaTranslator::new();
        assert!(matches!(tr.condition(&call), Err(SmtError::UnsupportedExpression(_))));

        let p = b.var("p", Type::Ptr);
        let v = b.volatile_deref(p, Type::u32());
        assert!(tr.condition(&v).is_err());
    }

    #[test]
    fn test_memoizes_by_node() {
        let mut b = AstBuilder::new();
        let e = b.eq_u32("x", 2);
        let mut tr = FormulaTranslator::new();
        tr.condition(&e).unwrap();
        let before = tr.memoized();
        tr.condition(&e).unwrap();
        assert_eq!(tr.memoized(), before);
        // x, 2 and ==
        assert_eq!(before, 3);
    }

    #[test]
    fn test_conflicting_sorts_rejected() {
        let mut b = AstBuilder::new();
        let a = b.var("v", Type::u32());
        let c = b.var("v", Type::u8());
        let mut tr = FormulaTranslator::new();
        tr.translate(&a).unwrap();
        assert!(matches!(tr.translate(&c), Err(SmtError::UnsupportedType(_))));
    }
}
