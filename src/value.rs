//! Lattice of abstract integer values for constant propagation.
//!
//! # Lattice Structure
//!
//! ```text
//!              NAC (Not A Constant)
//!          /    |    |    \
//!   ... Const(-1) Const(0) Const(1) ...
//!          \    |    |    /
//!              UNDEF
//! ```
//!
//! `Undef` is the bottom: nothing is known yet (or the point is unreachable so
//! far). `Nac` is the top: the variable may hold different values at runtime.
//! Distinct constants are incomparable, so their meet is `Nac`.
//!
//! # Examples
//!
//! ```
//! use dataflow_rs::value::Value;
//!
//! assert_eq!(Value::Constant(3).meet(Value::Undef), Value::Constant(3));
//! assert_eq!(Value::Constant(3).meet(Value::Constant(4)), Value::Nac);
//! assert!(Value::Undef.le(Value::Constant(3)));
//! ```

use std::fmt;

/// Abstract value of a single integer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Value {
    /// Bottom: not yet known
    #[default]
    Undef,
    /// Exactly this 32-bit value
    Constant(i32),
    /// Top: not a constant
    Nac,
}

impl Value {
    pub fn is_undef(self) -> bool {
        self == Value::Undef
    }

    pub fn is_constant(self) -> bool {
        matches!(self, Value::Constant(_))
    }

    pub fn is_nac(self) -> bool {
        self == Value::Nac
    }

    /// The constant, if this value is one.
    pub fn constant(self) -> Option<i32> {
        match self {
            Value::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Meets two values.
    ///
    /// `Undef` is the identity, `Nac` absorbs everything, and two constants
    /// survive only if they agree.
    pub fn meet(self, other: Value) -> Value {
        match (self, other) {
            (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
            (Value::Undef, v) | (v, Value::Undef) => v,
            (Value::Constant(a), Value::Constant(b)) => {
                if a == b {
                    Value::Constant(a)
                } else {
                    Value::Nac
                }
            }
        }
    }

    /// Partial order: `self ⊑ other`.
    pub fn le(self, other: Value) -> bool {
        match (self, other) {
            (Value::Undef, _) | (_, Value::Nac) => true,
            (Value::Constant(a), Value::Constant(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => write!(f, "UNDEF"),
            Value::Constant(c) => write!(f, "{}", c),
            Value::Nac => write!(f, "NAC"),
        }
    }
}

impl From<i32> for Value {
    fn from(c: i32) -> Self {
        Value::Constant(c)
    }
}
