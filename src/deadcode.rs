//! Dead code detection.
//!
//! Combines constant propagation and live variable analysis to find two kinds
//! of dead statements:
//!
//! - **Unreachable code**: statements that no path from the entry reaches,
//!   either because of the graph shape or because an `if`/`switch` whose test
//!   is a known constant never takes the edge leading to them.
//! - **Useless assignments**: `x = e` where `x` is not live afterwards and
//!   evaluating `e` has no side effect.
//!
//! # Algorithm
//!
//! Every node starts out dead. A FIFO walk from the entry marks each visited
//! node as resolved and revives it unless it is a useless assignment. The walk
//! always continues through useless assignments, since they still pass control
//! to their successors. Branches with a constant test only follow the edge
//! that the constant selects. The exit node is never reported.
//!
//! # Example
//!
//! ```
//! use dataflow_rs::deadcode::DeadCodeDetection;
//! use dataflow_rs::ir::{BinaryOp, Exp, Ir, StmtKind};
//! use dataflow_rs::types::Type;
//!
//! // 0: x = 1
//! // 1: if (x == x) goto 3
//! // 2: x = 2          <- unreachable
//! // 3: return x
//! let mut ir = Ir::new();
//! let x = ir.new_var("x", Type::Int);
//! ir.assign(x, Exp::IntLiteral(1));
//! ir.push(StmtKind::If { cond: Exp::binary(BinaryOp::Eq, x, x), target: 3 });
//! ir.assign(x, Exp::IntLiteral(2));
//! ir.push(StmtKind::Return(Some(x)));
//!
//! let dead = DeadCodeDetection::analyze(&ir).unwrap();
//! assert_eq!(dead.into_iter().collect::<Vec<_>>(), vec![2]);
//! ```

use std::collections::{BTreeSet, VecDeque};

use log::{debug, trace};

use crate::analysis::DataflowResult;
use crate::bitset::BitSet;
use crate::cfg::{Cfg, CfgError, EdgeKind};
use crate::constprop::{analyze_constants, ConstantPropagation};
use crate::fact::{CpFact, SetFact};
use crate::ir::{BinaryOp, Exp, Ir, StmtKind};
use crate::liveness::analyze_liveness;
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct DeadCodeDetection;

impl DeadCodeDetection {
    /// Builds the CFG of `ir`, runs both analyses and returns the dead statements.
    pub fn analyze(ir: &Ir) -> Result<BTreeSet<usize>, CfgError> {
        let cfg = Cfg::build(ir)?;
        let constants = analyze_constants(&cfg);
        let live_vars = analyze_liveness(&cfg);
        Ok(Self::detect(&cfg, &constants, &live_vars))
    }

    /// Returns the ids of all dead nodes of `cfg`, in ascending order.
    ///
    /// `constants` must hold converged constant propagation IN facts and
    /// `live_vars` converged live variable OUT facts for the same graph.
    pub fn detect(
        cfg: &Cfg,
        constants: &DataflowResult<CpFact>,
        live_vars: &DataflowResult<SetFact>,
    ) -> BTreeSet<usize> {
        let mut dead = BitSet::full(cfg.len());
        // Nodes already taken off the worklist; each is processed once.
        let mut resolved = BitSet::new(cfg.len());
        let mut worklist = VecDeque::from([cfg.entry()]);

        while let Some(node) = worklist.pop_front() {
            if !resolved.insert(node) {
                continue;
            }

            let stmt = cfg.stmt(node);
            let useless = match (stmt.def(), stmt.rvalue()) {
                (Some(var), Some(rvalue)) => {
                    !live_vars.out_fact(node).contains(var) && Self::has_no_side_effect(rvalue)
                }
                _ => false,
            };
            if !useless {
                dead.remove(node);
            }
            trace!("visit [{}] {}{}", node, stmt, if useless { " (useless)" } else { "" });

            match stmt.kind() {
                StmtKind::If { cond, .. } => {
                    let value = ConstantPropagation::evaluate(cond, constants.in_fact(node));
                    match value {
                        Value::Constant(c) => {
                            let taken = match c {
                                1 => EdgeKind::IfTrue,
                                0 => EdgeKind::IfFalse,
                                _ => panic!("condition of statement {} evaluated to {}", node, c),
                            };
                            debug!("[{}] {} always takes {:?}", node, stmt, taken);
                            worklist.extend(cfg.out_edges(node).iter().filter(|e| e.kind == taken).map(|e| e.target));
                        }
                        _ => worklist.extend(cfg.succs(node)),
                    }
                }
                StmtKind::Switch { var, default, .. } => match constants.in_fact(node).get(*var) {
                    Value::Constant(c) => {
                        let target = cfg
                            .out_edges(node)
                            .iter()
                            .find(|e| e.kind.case_value() == Some(c))
                            .map_or(*default, |e| e.target);
                        debug!("[{}] {} always jumps to {}", node, stmt, target);
                        worklist.push_back(target);
                    }
                    _ => worklist.extend(cfg.succs(node)),
                },
                _ => worklist.extend(cfg.succs(node)),
            }
        }

        dead.remove(cfg.exit());
        debug!("dead code: {} of {} nodes", dead.len(), cfg.len());
        dead.iter().collect()
    }

    /// Returns true if evaluating `rvalue` can neither fault nor touch the heap.
    pub fn has_no_side_effect(rvalue: &Exp) -> bool {
        match rvalue {
            // Allocation modifies the heap
            Exp::New(_)
            // Casts may fail
            | Exp::Cast { .. }
            // Static field reads may trigger class initialization,
            // instance field reads may hit a null receiver
            | Exp::FieldAccess { .. }
            // Null receiver or index out of bounds
            | Exp::ArrayAccess { .. } => false,
            // Division by zero
            Exp::Binary { op, .. } if op.is_arithmetic() => !matches!(op, BinaryOp::Div | BinaryOp::Rem),
            Exp::IntLiteral(_)
            | Exp::Var(_)
            | Exp::Binary { .. }
            | Exp::Neg(_)
            | Exp::InstanceOf { .. }
            | Exp::ArrayLength(_) => true,
        }
    }
}
