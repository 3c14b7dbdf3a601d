//! Dataflow facts attached to CFG nodes.
//!
//! - [`CpFact`]: variable → [`Value`] map used by constant propagation.
//! - [`SetFact`]: set of variables used by live variable analysis.
//!
//! Both facts are only mutated through methods that report whether anything
//! changed, which is what the solver uses to detect the fixpoint.

use std::collections::HashMap;
use std::fmt;

use crate::bitset::BitSet;
use crate::types::Var;
use crate::value::Value;

/// Constant propagation fact.
///
/// Absent variables are implicitly [`Value::Undef`], so an empty fact is the
/// bottom element and storing `Undef` simply removes the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpFact {
    values: HashMap<Var, Value>,
}

impl CpFact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `var`, or `Undef` if it has no entry.
    pub fn get(&self, var: Var) -> Value {
        self.values.get(&var).copied().unwrap_or_default()
    }

    /// Sets the value of `var`. Returns true if the stored value changed.
    pub fn update(&mut self, var: Var, value: Value) -> bool {
        if value.is_undef() {
            return self.values.remove(&var).is_some();
        }
        self.values.insert(var, value) != Some(value)
    }

    /// Drops the entry of `var`. Returns true if it was present.
    pub fn remove(&mut self, var: Var) -> bool {
        self.values.remove(&var).is_some()
    }

    /// Makes `self` equal to `other`. Returns true if `self` changed.
    pub fn copy_from(&mut self, other: &CpFact) -> bool {
        if self == other {
            return false;
        }
        self.values.clone_from(&other.values);
        true
    }

    /// Iterates over the explicitly stored (non-`Undef`) entries.
    pub fn iter(&self) -> impl Iterator<Item = (Var, Value)> + '_ {
        self.values.iter().map(|(&var, &value)| (var, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(Var, Value)> for CpFact {
    fn from_iter<I: IntoIterator<Item = (Var, Value)>>(iter: I) -> Self {
        let mut fact = CpFact::new();
        for (var, value) in iter {
            fact.update(var, value);
        }
        fact
    }
}

impl fmt::Display for CpFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by_key(|&(var, _)| var);

        write!(f, "{{")?;
        for (i, (var, value)) in entries.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", var, value)?;
        }
        write!(f, "}}")
    }
}

/// Set of variables, e.g. the variables live at a program point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetFact {
    vars: BitSet,
}

impl SetFact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, var: Var) -> bool {
        self.vars.contains(var.index())
    }

    /// Returns true if `var` was not already present.
    pub fn add(&mut self, var: Var) -> bool {
        self.vars.insert(var.index())
    }

    /// Returns true if `var` was present.
    pub fn remove(&mut self, var: Var) -> bool {
        self.vars.remove(var.index())
    }

    /// Adds all variables of `other`. Returns true if `self` changed.
    pub fn union_with(&mut self, other: &SetFact) -> bool {
        self.vars.union_with(&other.vars)
    }

    /// Makes `self` equal to `other`. Returns true if `self` changed.
    pub fn copy_from(&mut self, other: &SetFact) -> bool {
        if self == other {
            return false;
        }
        self.vars.clone_from(&other.vars);
        true
    }

    /// Variables in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Var> + '_ {
        self.vars.iter().map(|i| Var::new(i as u32))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl FromIterator<Var> for SetFact {
    fn from_iter<I: IntoIterator<Item = Var>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(Var::index).collect(),
        }
    }
}

impl fmt::Display for SetFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, var) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", var)?;
        }
        write!(f, "]")
    }
}
