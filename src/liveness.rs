//! Live variable analysis.
//!
//! A variable is live at a program point if some path from that point reads
//! it before overwriting it. The analysis runs backward:
//!
//! ```text
//! OUT[s] = ∪ IN[t]  for t in succs(s)
//! IN[s]  = uses(s) ∪ (OUT[s] − def(s))
//! ```
//!
//! Dead-code detection consumes the OUT facts: an assignment whose target is
//! not live after it has no observable effect through that variable.

use crate::analysis::{DataflowAnalysis, DataflowResult};
use crate::cfg::Cfg;
use crate::fact::SetFact;
use crate::ir::Stmt;
use crate::solver::Solver;

#[derive(Debug, Clone, Copy, Default)]
pub struct LiveVariableAnalysis;

impl LiveVariableAnalysis {
    pub fn new() -> Self {
        Self
    }
}

impl DataflowAnalysis for LiveVariableAnalysis {
    type Fact = SetFact;

    fn is_forward(&self) -> bool {
        false
    }

    fn new_boundary_fact(&self, _cfg: &Cfg) -> SetFact {
        SetFact::new()
    }

    fn new_initial_fact(&self) -> SetFact {
        SetFact::new()
    }

    fn meet_into(&self, fact: &SetFact, target: &mut SetFact) -> bool {
        target.union_with(fact)
    }

    fn transfer_node(&self, stmt: &Stmt, out: &SetFact, in_fact: &mut SetFact) -> bool {
        let mut live = out.clone();
        if let Some(def) = stmt.def() {
            live.remove(def);
        }
        for var in stmt.uses() {
            live.add(var);
        }
        in_fact.copy_from(&live)
    }
}

/// Runs live variable analysis on `cfg` with the default solver.
pub fn analyze_liveness(cfg: &Cfg) -> DataflowResult<SetFact> {
    Solver::new().solve(&LiveVariableAnalysis, cfg)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::ir::{BinaryOp, Exp, Ir, StmtKind};
    use crate::types::{Type, Var};

    fn vars(fact: &SetFact) -> Vec<Var> {
        fact.iter().collect()
    }

    #[test]
    fn test_straight_line() {
        // 0: a = 1
        // 1: b = a + a
        // 2: a = 2
        // 3: return b
        let mut ir = Ir::new();
        let a = ir.new_var("a", Type::Int);
        let b = ir.new_var("b", Type::Int);
        ir.assign(a, Exp::IntLiteral(1));
        ir.assign(b, Exp::binary(BinaryOp::Add, a, a));
        ir.assign(a, Exp::IntLiteral(2));
        ir.push(StmtKind::Return(Some(b)));

        let cfg = Cfg::build(&ir).unwrap();
        let live = analyze_liveness(&cfg);

        assert_eq!(vars(live.out_fact(0)), vec![a]);
        assert_eq!(vars(live.out_fact(1)), vec![b]);
        // `a = 2` is never read
        assert_eq!(vars(live.out_fact(2)), vec![b]);
        assert!(live.out_fact(3).is_empty());
        assert!(live.in_fact(0).is_empty());
    }

    #[test]
    fn test_loop_keeps_counter_live() {
        // 0: i = 0
        // 1: if (i < n) goto 3
        // 2: return
        // 3: i = i + n
        // 4: goto 1
        let mut ir = Ir::new();
        let n = ir.new_param("n", Type::Int);
        let i = ir.new_var("i", Type::Int);
        ir.assign(i, Exp::IntLiteral(0));
        ir.push(StmtKind::If {
            cond: Exp::binary(BinaryOp::Lt, i, n),
            target: 3,
        });
        ir.push(StmtKind::Return(None));
        ir.assign(i, Exp::binary(BinaryOp::Add, i, n));
        ir.push(StmtKind::Goto { target: 1 });

        let cfg = Cfg::build(&ir).unwrap();
        let live = analyze_liveness(&cfg);

        assert_eq!(vars(live.out_fact(3)), vec![n, i]);
        assert_eq!(vars(live.in_fact(1)), vec![n, i]);
        assert_eq!(vars(live.in_fact(cfg.entry())), vec![n]);
        assert!(live.out_fact(2).is_empty());
    }

    #[test]
    fn test_transfer_def_then_use() {
        // x = x + y: x is both killed and used, so it stays live on entry
        let mut ir = Ir::new();
        let x = ir.new_var("x", Type::Int);
        let y = ir.new_var("y", Type::Int);
        let s = ir.assign(x, Exp::binary(BinaryOp::Add, x, y));

        let out = SetFact::new();
        let mut in_fact = SetFact::new();
        assert!(LiveVariableAnalysis.transfer_node(ir.stmt(s), &out, &mut in_fact));
        assert_eq!(vars(&in_fact), vec![x, y]);
        assert!(!LiveVariableAnalysis.transfer_node(ir.stmt(s), &out, &mut in_fact));
    }
}
