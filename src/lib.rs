//! # dataflow-rs: Constant Propagation and Dead Code Detection
//!
//! **`dataflow-rs`** is an intraprocedural dataflow analysis library working on a
//! statement-level control-flow graph of a three-address intermediate representation.
//!
//! ## What does it compute?
//!
//! - **Constant propagation**: for every program point, which integer variables hold
//!   a single known value. Values live in a three-level lattice
//!   (`UNDEF` ⊑ constant ⊑ `NAC`), see [`value`].
//! - **Live variables**: which variables may still be read after each statement.
//! - **Dead code**: statements that never execute (unreachable, possibly through
//!   branches whose condition is a known constant) and assignments whose result is
//!   never read and whose right-hand side has no side effect.
//!
//! ## Basic Usage
//!
//! ```rust
//! use dataflow_rs::cfg::Cfg;
//! use dataflow_rs::constprop::analyze_constants;
//! use dataflow_rs::deadcode::DeadCodeDetection;
//! use dataflow_rs::ir::{BinaryOp, Exp, Ir, StmtKind};
//! use dataflow_rs::types::Type;
//! use dataflow_rs::value::Value;
//!
//! // 1. Describe the procedure
//! let mut ir = Ir::new();
//! let a = ir.new_var("a", Type::Int);
//! let b = ir.new_var("b", Type::Int);
//! ir.assign(a, Exp::IntLiteral(6));
//! ir.assign(b, Exp::binary(BinaryOp::Mul, a, a)); // never read
//! ir.push(StmtKind::Return(Some(a)));
//!
//! // 2. Build the CFG and run constant propagation
//! let cfg = Cfg::build(&ir).unwrap();
//! let constants = analyze_constants(&cfg);
//! assert_eq!(constants.out_fact(1).get(b), Value::Constant(36));
//!
//! // 3. Find dead statements
//! let dead = DeadCodeDetection::analyze(&ir).unwrap();
//! assert!(dead.contains(&1));
//! ```
//!
//! ## Core Components
//!
//! - **[`ir`]** and **[`cfg`]**: the program representation and its control-flow graph.
//! - **[`analysis`]** and **[`solver`]**: the analysis interface and the worklist fixpoint solver.
//! - **[`constprop`]**, **[`liveness`]**: the two analyses.
//! - **[`deadcode`]**: the dead code detection pass built on top of them.
//! - **[`dot`]**: Graphviz export of the CFG with dead nodes highlighted.

pub mod analysis;
pub mod bitset;
pub mod cfg;
pub mod constprop;
pub mod deadcode;
pub mod dot;
pub mod fact;
pub mod ir;
pub mod liveness;
pub mod solver;
pub mod types;
pub mod value;
