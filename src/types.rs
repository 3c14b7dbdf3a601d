//! Type-safe wrappers for program variables and their primitive types.
//!
//! This module provides the [`Var`] newtype, which identifies a variable by
//! its slot in the owning [`Ir`][crate::ir::Ir], and the [`Type`] enum, which
//! decides whether the variable is tracked by constant propagation.
use std::fmt;

/// A variable identifier (0-indexed slot in the IR variable table).
///
/// Variables are cheap to copy and compare. Their names and types live in the
/// [`Ir`][crate::ir::Ir] that created them.
///
/// # Invariants
///
/// - A `Var` is only meaningful together with the IR that allocated it
/// - Ordering follows allocation order, which keeps fact dumps deterministic
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates a variable handle for the given slot.
    pub fn new(index: u32) -> Self {
        Var(index)
    }

    /// Returns the raw slot index as a `u32`.
    pub fn id(self) -> u32 {
        self.0
    }

    /// Returns the slot index as a `usize`, suitable for bit sets.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

impl From<Var> for usize {
    fn from(var: Var) -> Self {
        var.0 as usize
    }
}

/// Static type of a variable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Type {
    Byte,
    Short,
    Int,
    Char,
    Boolean,
    Long,
    Float,
    Double,
    /// Any class, interface or array type.
    Reference,
}

impl Type {
    /// Returns true if a variable of this type may hold a 32-bit integer value.
    ///
    /// Only these variables are tracked by constant propagation.
    pub fn can_hold_int(self) -> bool {
        matches!(self, Type::Byte | Type::Short | Type::Int | Type::Char | Type::Boolean)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Byte => "byte",
            Type::Short => "short",
            Type::Int => "int",
            Type::Char => "char",
            Type::Boolean => "boolean",
            Type::Long => "long",
            Type::Float => "float",
            Type::Double => "double",
            Type::Reference => "ref",
        };
        f.write_str(name)
    }
}
