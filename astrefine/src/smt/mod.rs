//! Expression-to-formula translation and the solver bridge
//!
//! Conditions are translated to SMT-LIB2 terms over fixed-width
//! bit-vectors (`QF_BV`), mirroring C integer semantics, and handed to an
//! external solver process. A [`ProofSession`] bundles one translator, one
//! prover and a time budget; each pass invocation that needs proofs owns
//! exactly one session, so symbol names never leak between runs.

mod session;
mod solver;
mod translate;

pub use session::*;
pub use solver::*;
pub use translate::*;

#[cfg(test)]
pub(crate) use solver::testing;

use thiserror::Error;

/// SMT-LIB2 sorts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtSort {
    Bool,
    BitVec(u16),
}

impl SmtSort {
    /// Convert to SMT-LIB2 string
    pub fn to_smt(&self) -> String {
        match self {
            SmtSort::Bool => "Bool".to_string(),
            SmtSort::BitVec(n) => format!("(_ BitVec {})", n),
        }
    }
}

/// A translated term together with its sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub text: String,
    pub sort: SmtSort,
}

impl Term {
    pub fn new(text: impl Into<String>, sort: SmtSort) -> Self {
        Self {
            text: text.into(),
            sort,
        }
    }

    pub fn bool(text: impl Into<String>) -> Self {
        Self::new(text, SmtSort::Bool)
    }

    pub fn truth(value: bool) -> Self {
        Self::bool(if value { "true" } else { "false" })
    }

    pub fn not(t: &Term) -> Term {
        Term::bool(format!("(not {})", t.text))
    }

    /// Conjunction; the empty conjunction is `true`
    pub fn and(terms: &[Term]) -> Term {
        match terms {
            [] => Term::truth(true),
            [single] => single.clone(),
            _ => Term::bool(format!("(and {})", join(terms))),
        }
    }

    /// Disjunction; the empty disjunction is `false`
    pub fn or(terms: &[Term]) -> Term {
        match terms {
            [] => Term::truth(false),
            [single] => single.clone(),
            _ => Term::bool(format!("(or {})", join(terms))),
        }
    }
}

fn join(terms: &[Term]) -> String {
    terms
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Translation error. Never fatal: the candidate rewrite is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmtError {
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
}

/// Quote a C identifier as an SMT-LIB2 symbol
pub fn quote_symbol(name: &str) -> String {
    let clean: String = name
        .chars()
        .map(|c| if c == '|' || c == '\\' { '_' } else { c })
        .collect();
    format!("|{}|", clean)
}
