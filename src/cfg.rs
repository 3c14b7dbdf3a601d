//! Statement-level control-flow graph.
//!
//! Every statement of an [`Ir`] becomes one node whose id equals the
//! statement index. Two synthetic `nop` nodes are appended after the body:
//! the entry (id `n`) and the exit (id `n + 1`), where `n` is the number of
//! statements. Keeping user statements at their own indices means result
//! sets can be reported directly in terms of the IR.
//!
//! ```
//! use dataflow_rs::cfg::{Cfg, EdgeKind};
//! use dataflow_rs::ir::{Exp, Ir, StmtKind};
//! use dataflow_rs::types::Type;
//!
//! let mut ir = Ir::new();
//! let x = ir.new_var("x", Type::Int);
//! ir.assign(x, Exp::IntLiteral(1));
//! ir.push(StmtKind::Return(Some(x)));
//!
//! let cfg = Cfg::build(&ir).unwrap();
//! assert_eq!(cfg.entry(), 2);
//! assert_eq!(cfg.exit(), 3);
//! assert_eq!(cfg.succs(cfg.entry()).collect::<Vec<_>>(), vec![0]);
//! assert_eq!(cfg.out_edges(1)[0].kind, EdgeKind::Return);
//! ```

use std::collections::HashSet;

use log::debug;
use thiserror::Error;

use crate::ir::{Exp, Ir, Stmt, StmtKind};
use crate::types::Var;

/// Kind of a control-flow edge.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EdgeKind {
    /// From the entry node to the first statement
    Entry,
    /// To the next statement in program order
    FallThrough,
    /// Unconditional jump
    Goto,
    /// Taken branch of an `if`
    IfTrue,
    /// Not-taken branch of an `if`
    IfFalse,
    /// Switch case with its label
    SwitchCase(i32),
    /// Switch default target
    SwitchDefault,
    /// From a `return` to the exit node
    Return,
}

impl EdgeKind {
    /// Edges that are always taken when their source executes.
    pub fn is_unconditional(self) -> bool {
        matches!(self, EdgeKind::Entry | EdgeKind::FallThrough | EdgeKind::Goto | EdgeKind::Return)
    }

    pub fn is_switch_case(self) -> bool {
        matches!(self, EdgeKind::SwitchCase(_))
    }

    /// Case label of a switch-case edge.
    pub fn case_value(self) -> Option<i32> {
        match self {
            EdgeKind::SwitchCase(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub kind: EdgeKind,
}

/// Errors detected while building a [`Cfg`].
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CfgError {
    #[error("statement {stmt}: jump target {target} is out of range")]
    InvalidTarget { stmt: usize, target: usize },
    #[error("statement {stmt}: duplicate switch case {value}")]
    DuplicateCase { stmt: usize, value: i32 },
    #[error("statement {stmt}: `if` condition must be a relational binary expression")]
    MalformedCondition { stmt: usize },
    #[error("statement {stmt}: unknown variable {var}")]
    UnknownVar { stmt: usize, var: Var },
}

/// Control-flow graph of one procedure.
#[derive(Debug)]
pub struct Cfg<'ir> {
    ir: &'ir Ir,
    entry: Stmt,
    exit: Stmt,
    out_edges: Vec<Vec<Edge>>,
    in_edges: Vec<Vec<Edge>>,
}

impl<'ir> Cfg<'ir> {
    /// Builds the CFG of `ir`, validating all jump targets.
    pub fn build(ir: &'ir Ir) -> Result<Self, CfgError> {
        let n = ir.len();
        let entry = n;
        let exit = n + 1;

        let mut cfg = Cfg {
            ir,
            entry: Stmt::new(entry, StmtKind::Nop),
            exit: Stmt::new(exit, StmtKind::Nop),
            out_edges: vec![Vec::new(); n + 2],
            in_edges: vec![Vec::new(); n + 2],
        };

        cfg.add_edge(entry, if n == 0 { exit } else { 0 }, EdgeKind::Entry);

        for stmt in ir.stmts() {
            let i = stmt.index();
            let next = i + 1; // == entry for the last statement, mapped to exit below
            let next = if next == n { exit } else { next };
            let check = |target: usize| {
                if target < n {
                    Ok(target)
                } else {
                    Err(CfgError::InvalidTarget { stmt: i, target })
                }
            };

            if let Some(var) = stmt.def().into_iter().chain(stmt.uses()).find(|v| v.index() >= ir.num_vars()) {
                return Err(CfgError::UnknownVar { stmt: i, var });
            }

            match stmt.kind() {
                StmtKind::Goto { target } => {
                    cfg.add_edge(i, check(*target)?, EdgeKind::Goto);
                }
                StmtKind::If { cond, target } => {
                    if !matches!(cond, Exp::Binary { op, .. } if op.is_condition()) {
                        return Err(CfgError::MalformedCondition { stmt: i });
                    }
                    cfg.add_edge(i, check(*target)?, EdgeKind::IfTrue);
                    cfg.add_edge(i, next, EdgeKind::IfFalse);
                }
                StmtKind::Switch { cases, default, .. } => {
                    let mut seen = HashSet::new();
                    for &(value, target) in cases {
                        if !seen.insert(value) {
                            return Err(CfgError::DuplicateCase { stmt: i, value });
                        }
                        cfg.add_edge(i, check(target)?, EdgeKind::SwitchCase(value));
                    }
                    cfg.add_edge(i, check(*default)?, EdgeKind::SwitchDefault);
                }
                StmtKind::Return(_) => {
                    cfg.add_edge(i, exit, EdgeKind::Return);
                }
                StmtKind::Nop | StmtKind::Assign { .. } | StmtKind::Invoke { .. } => {
                    cfg.add_edge(i, next, EdgeKind::FallThrough);
                }
            }
        }

        debug!(
            "built cfg: {} nodes, {} edges",
            cfg.len(),
            cfg.out_edges.iter().map(Vec::len).sum::<usize>()
        );
        Ok(cfg)
    }

    fn add_edge(&mut self, source: usize, target: usize, kind: EdgeKind) {
        let edge = Edge { source, target, kind };
        self.out_edges[source].push(edge);
        self.in_edges[target].push(edge);
    }

    pub fn ir(&self) -> &'ir Ir {
        self.ir
    }

    pub fn params(&self) -> &'ir [Var] {
        self.ir.params()
    }

    pub fn entry(&self) -> usize {
        self.entry.index()
    }

    pub fn exit(&self) -> usize {
        self.exit.index()
    }

    pub fn is_entry(&self, node: usize) -> bool {
        node == self.entry()
    }

    pub fn is_exit(&self, node: usize) -> bool {
        node == self.exit()
    }

    /// Number of nodes, including entry and exit.
    pub fn len(&self) -> usize {
        self.out_edges.len()
    }

    /// A CFG always holds at least its entry and exit nodes.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All node ids in ascending order.
    pub fn nodes(&self) -> std::ops::Range<usize> {
        0..self.len()
    }

    /// Statement at the given node.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a node of this graph.
    pub fn stmt(&self, node: usize) -> &Stmt {
        if node == self.entry() {
            &self.entry
        } else if node == self.exit() {
            &self.exit
        } else {
            self.ir.stmt(node)
        }
    }

    pub fn out_edges(&self, node: usize) -> &[Edge] {
        &self.out_edges[node]
    }

    pub fn in_edges(&self, node: usize) -> &[Edge] {
        &self.in_edges[node]
    }

    pub fn succs(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.out_edges[node].iter().map(|e| e.target)
    }

    pub fn preds(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.in_edges[node].iter().map(|e| e.source)
    }
}
