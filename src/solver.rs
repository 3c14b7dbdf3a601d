//! Worklist fixpoint solver for [`DataflowAnalysis`] implementations.
//!
//! Forward analyses:
//!
//! ```text
//! OUT[entry] = boundary
//! IN[s]      = ⊓ OUT[p]  for p in preds(s)
//! OUT[s]     = transfer(s, IN[s])
//! ```
//!
//! Backward analyses mirror this with `IN[exit] = boundary` and successors
//! in place of predecessors. A node is re-queued whenever the fact feeding
//! it may have changed, and never sits in the queue twice.

use std::collections::VecDeque;

use log::{debug, warn};

use crate::analysis::{DataflowAnalysis, DataflowResult};
use crate::bitset::BitSet;
use crate::cfg::Cfg;

/// Configuration for the fixpoint solver.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum number of node visits before giving up.
    ///
    /// Monotone analyses over finite-height lattices always converge well
    /// below this; the cap only guards against broken transfer functions.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
        }
    }
}

impl SolverConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Iterative worklist solver.
#[derive(Debug, Clone, Default)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Runs `analysis` on `cfg` until no fact changes.
    pub fn solve<A: DataflowAnalysis>(&self, analysis: &A, cfg: &Cfg) -> DataflowResult<A::Fact> {
        let mut result = DataflowResult::new(cfg.len(), analysis.new_initial_fact());
        if analysis.is_forward() {
            result.set_out_fact(cfg.entry(), analysis.new_boundary_fact(cfg));
            self.solve_forward(analysis, cfg, &mut result);
        } else {
            result.set_in_fact(cfg.exit(), analysis.new_boundary_fact(cfg));
            self.solve_backward(analysis, cfg, &mut result);
        }
        result
    }

    fn solve_forward<A: DataflowAnalysis>(&self, analysis: &A, cfg: &Cfg, result: &mut DataflowResult<A::Fact>) {
        let (in_facts, out_facts) = result.facts_mut();
        let mut worklist = Worklist::new(cfg.nodes().filter(|&n| !cfg.is_entry(n)));
        let mut iterations = 0;

        while let Some(node) = worklist.pop() {
            iterations += 1;
            if iterations > self.config.max_iterations {
                warn!(
                    "Forward analysis did not converge after {} iterations",
                    self.config.max_iterations
                );
                return;
            }

            for pred in cfg.preds(node) {
                analysis.meet_into(&out_facts[pred], &mut in_facts[node]);
            }
            if analysis.transfer_node(cfg.stmt(node), &in_facts[node], &mut out_facts[node]) {
                worklist.extend(cfg.succs(node));
            }
        }

        debug!("Forward analysis converged after {} iterations", iterations);
    }

    fn solve_backward<A: DataflowAnalysis>(&self, analysis: &A, cfg: &Cfg, result: &mut DataflowResult<A::Fact>) {
        let (in_facts, out_facts) = result.facts_mut();
        // Reverse order visits most nodes after their successors on the first pass.
        let mut worklist = Worklist::new(cfg.nodes().rev().filter(|&n| !cfg.is_exit(n)));
        let mut iterations = 0;

        while let Some(node) = worklist.pop() {
            iterations += 1;
            if iterations > self.config.max_iterations {
                warn!(
                    "Backward analysis did not converge after {} iterations",
                    self.config.max_iterations
                );
                return;
            }

            for succ in cfg.succs(node) {
                analysis.meet_into(&in_facts[succ], &mut out_facts[node]);
            }
            if analysis.transfer_node(cfg.stmt(node), &out_facts[node], &mut in_facts[node]) {
                worklist.extend(cfg.preds(node));
            }
        }

        debug!("Backward analysis converged after {} iterations", iterations);
    }
}

/// FIFO queue of node ids without duplicates.
struct Worklist {
    queue: VecDeque<usize>,
    queued: BitSet,
}

impl Worklist {
    fn new(nodes: impl IntoIterator<Item = usize>) -> Self {
        let mut worklist = Self {
            queue: VecDeque::new(),
            queued: BitSet::default(),
        };
        worklist.extend(nodes);
        worklist
    }

    fn pop(&mut self) -> Option<usize> {
        let node = self.queue.pop_front()?;
        self.queued.remove(node);
        Some(node)
    }

    fn extend(&mut self, nodes: impl IntoIterator<Item = usize>) {
        for node in nodes {
            if self.queued.insert(node) {
                self.queue.push_back(node);
            }
        }
    }
}
