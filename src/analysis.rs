//! Dataflow analysis interface and per-node result table.

use std::fmt::Debug;

use crate::cfg::Cfg;
use crate::ir::Stmt;

/// A monotone dataflow analysis over a statement-level [`Cfg`].
///
/// The analysis supplies the lattice operations and the transfer function;
/// the iteration itself is done by [`Solver`][crate::solver::Solver].
///
/// # Contract
///
/// - `meet_into` and `transfer_node` must be monotone
/// - both must report `true` exactly when the target fact was modified,
///   otherwise the solver may stop early or never stop
pub trait DataflowAnalysis {
    /// Fact attached to each program point.
    type Fact: Clone + Debug + PartialEq;

    /// Direction of the analysis: forward facts flow from entry to exit.
    fn is_forward(&self) -> bool;

    /// Fact at the boundary node: OUT of the entry (forward) or IN of the exit (backward).
    fn new_boundary_fact(&self, cfg: &Cfg) -> Self::Fact;

    /// Fact every other program point starts with.
    fn new_initial_fact(&self) -> Self::Fact;

    /// Meets `fact` into `target`. Returns true if `target` changed.
    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact) -> bool;

    /// Computes the fact leaving `stmt` from the fact reaching it.
    ///
    /// For forward analyses `input` is IN and `output` is OUT; backward
    /// analyses get OUT as `input` and update IN. Returns true if `output`
    /// changed.
    fn transfer_node(&self, stmt: &Stmt, input: &Self::Fact, output: &mut Self::Fact) -> bool;
}

/// IN and OUT facts of every CFG node, indexed by node id.
#[derive(Debug, Clone, PartialEq)]
pub struct DataflowResult<F> {
    in_facts: Vec<F>,
    out_facts: Vec<F>,
}

impl<F: Clone> DataflowResult<F> {
    /// Creates a result where every node starts with `initial` on both sides.
    pub fn new(num_nodes: usize, initial: F) -> Self {
        Self {
            in_facts: vec![initial.clone(); num_nodes],
            out_facts: vec![initial; num_nodes],
        }
    }
}

impl<F> DataflowResult<F> {
    /// Fact holding just before `node` executes.
    pub fn in_fact(&self, node: usize) -> &F {
        &self.in_facts[node]
    }

    /// Fact holding just after `node` executes.
    pub fn out_fact(&self, node: usize) -> &F {
        &self.out_facts[node]
    }

    pub fn set_in_fact(&mut self, node: usize, fact: F) {
        self.in_facts[node] = fact;
    }

    pub fn set_out_fact(&mut self, node: usize, fact: F) {
        self.out_facts[node] = fact;
    }

    pub fn len(&self) -> usize {
        self.in_facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_facts.is_empty()
    }

    /// Both fact vectors at once, so one side can be read while the other is updated.
    pub(crate) fn facts_mut(&mut self) -> (&mut Vec<F>, &mut Vec<F>) {
        (&mut self.in_facts, &mut self.out_facts)
    }
}
