//! Type annotations carried by expressions

use serde::{Deserialize, Serialize};

/// Scalar type of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Bool,
    /// Fixed-width integer
    Int { bits: u16, signed: bool },
    /// Data pointer (modelled as a 64-bit address)
    Ptr,
    Void,
}

impl Type {
    pub const fn int(bits: u16, signed: bool) -> Self {
        Type::Int { bits, signed }
    }

    pub const fn i32() -> Self {
        Type::int(32, true)
    }

    pub const fn u32() -> Self {
        Type::int(32, false)
    }

    pub const fn i64() -> Self {
        Type::int(64, true)
    }

    pub const fn u64() -> Self {
        Type::int(64, false)
    }

    pub const fn u8() -> Self {
        Type::int(8, false)
    }

    /// Width in bits when the value is modelled as a bit-vector
    pub fn bit_width(&self) -> Option<u16> {
        match self {
            Type::Bool => Some(1),
            Type::Int { bits, .. } => Some(*bits),
            Type::Ptr => Some(64),
            Type::Void => None,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::Int { signed: true, .. })
    }

    /// Type after C's integer promotions.
    ///
    /// `_Bool` and every integer narrower than `int` become `int`, since
    /// `int` holds all of their values.
    pub fn promote(self) -> Type {
        match self {
            Type::Bool => Type::i32(),
            Type::Int { bits, .. } if bits < 32 => Type::i32(),
            other => other,
        }
    }

    /// Common type of a binary arithmetic operation.
    ///
    /// Follows C's usual arithmetic conversions: both operands are promoted,
    /// then the wider operand wins, and on equal width unsigned wins.
    pub fn common(lhs: Type, rhs: Type) -> Type {
        match (lhs.promote(), rhs.promote()) {
            (Type::Ptr, _) | (_, Type::Ptr) => Type::Ptr,
            (Type::Int { bits: lb, signed: ls }, Type::Int { bits: rb, signed: rs }) => {
                if lb > rb {
                    Type::int(lb, ls)
                } else if rb > lb {
                    Type::int(rb, rs)
                } else {
                    Type::int(lb, ls && rs)
                }
            }
            (Type::Void, other) | (other, Type::Void) => other,
            (l, _) => l,
        }
    }

    /// C spelling, used by the text rendering
    pub fn c_name(&self) -> String {
        match self {
            Type::Bool => "_Bool".to_string(),
            Type::Int { bits, signed } => {
                let base = match bits {
                    8 if *signed => return "signed char".to_string(),
                    8 => "char",
                    16 => "short",
                    32 => "int",
                    64 => "long long",
                    _ => return format!("{}int{}_t", if *signed { "" } else { "u" }, bits),
                };
                if *signed {
                    base.to_string()
                } else {
                    format!("unsigned {base}")
                }
            }
            Type::Ptr => "void *".to_string(),
            Type::Void => "void".to_string(),
        }
    }
}
