//! Intraprocedural constant propagation.
//!
//! Tracks, for every program point, which integer-typed variables hold a
//! compile-time constant. Facts are [`CpFact`]s over the [`Value`] lattice;
//! the analysis runs forward through the generic [`Solver`].
//!
//! # Evaluation rules
//!
//! - literals evaluate to themselves, variables to their current value
//! - a binary expression whose divisor is the constant `0` (for `/` and `%`)
//!   evaluates to `UNDEF`: the division never completes, so no value flows on
//! - two constant operands are folded with exact 32-bit semantics
//!   (wrapping arithmetic, truncating division, shift amounts masked to 5 bits)
//! - otherwise any `NAC` operand makes the result `NAC`, and any remaining
//!   `UNDEF` operand keeps it `UNDEF`
//! - every other expression (allocation, cast, field or array read, call)
//!   is `NAC`
//!
//! # Example
//!
//! ```
//! use dataflow_rs::cfg::Cfg;
//! use dataflow_rs::constprop::analyze_constants;
//! use dataflow_rs::ir::{BinaryOp, Exp, Ir, StmtKind};
//! use dataflow_rs::types::Type;
//! use dataflow_rs::value::Value;
//!
//! let mut ir = Ir::new();
//! let x = ir.new_var("x", Type::Int);
//! let y = ir.new_var("y", Type::Int);
//! ir.assign(x, Exp::IntLiteral(6));
//! ir.assign(y, Exp::binary(BinaryOp::Mul, x, x));
//! ir.push(StmtKind::Return(Some(y)));
//!
//! let cfg = Cfg::build(&ir).unwrap();
//! let constants = analyze_constants(&cfg);
//! assert_eq!(constants.in_fact(2).get(y), Value::Constant(36));
//! ```

use log::trace;

use crate::analysis::{DataflowAnalysis, DataflowResult};
use crate::cfg::Cfg;
use crate::fact::CpFact;
use crate::ir::{BinaryOp, Exp, Ir, Stmt};
use crate::solver::Solver;
use crate::types::Var;
use crate::value::Value;

/// Constant propagation over the variables of one [`Ir`].
#[derive(Debug, Clone, Copy)]
pub struct ConstantPropagation<'ir> {
    ir: &'ir Ir,
}

impl<'ir> ConstantPropagation<'ir> {
    pub fn new(ir: &'ir Ir) -> Self {
        Self { ir }
    }

    /// Returns true if `var` may hold an integer value and is therefore tracked.
    pub fn can_hold_int(ir: &Ir, var: Var) -> bool {
        ir.var_type(var).can_hold_int()
    }

    /// Meets two values.
    pub fn meet_value(v1: Value, v2: Value) -> Value {
        v1.meet(v2)
    }

    /// Evaluates `exp` under the fact `input`.
    pub fn evaluate(exp: &Exp, input: &CpFact) -> Value {
        match exp {
            Exp::IntLiteral(n) => Value::Constant(*n),
            Exp::Var(v) => input.get(*v),
            Exp::Binary { op, lhs, rhs } => {
                let v1 = input.get(*lhs);
                let v2 = input.get(*rhs);

                if matches!(op, BinaryOp::Div | BinaryOp::Rem) && v2 == Value::Constant(0) {
                    return Value::Undef;
                }

                match (v1, v2) {
                    (Value::Constant(a), Value::Constant(b)) => Value::Constant(fold(*op, a, b)),
                    (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
                    _ => Value::Undef,
                }
            }
            Exp::Neg(_)
            | Exp::New(_)
            | Exp::Cast { .. }
            | Exp::InstanceOf { .. }
            | Exp::FieldAccess { .. }
            | Exp::ArrayAccess { .. }
            | Exp::ArrayLength(_) => Value::Nac,
        }
    }
}

/// Applies `op` to two concrete 32-bit operands.
///
/// Division by zero must be filtered out by the caller.
fn fold(op: BinaryOp, a: i32, b: i32) -> i32 {
    match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            assert_ne!(b, 0, "constant division by zero reached the folder");
            a.wrapping_div(b)
        }
        BinaryOp::Rem => {
            assert_ne!(b, 0, "constant remainder by zero reached the folder");
            a.wrapping_rem(b)
        }
        BinaryOp::Or => a | b,
        BinaryOp::And => a & b,
        BinaryOp::Xor => a ^ b,
        // `wrapping_*` shifts mask the amount to its low 5 bits
        BinaryOp::Shl => a.wrapping_shl(b as u32),
        BinaryOp::Shr => a.wrapping_shr(b as u32),
        BinaryOp::Ushr => (a as u32).wrapping_shr(b as u32) as i32,
        BinaryOp::Eq => (a == b) as i32,
        BinaryOp::Ne => (a != b) as i32,
        BinaryOp::Lt => (a < b) as i32,
        BinaryOp::Le => (a <= b) as i32,
        BinaryOp::Gt => (a > b) as i32,
        BinaryOp::Ge => (a >= b) as i32,
    }
}

impl DataflowAnalysis for ConstantPropagation<'_> {
    type Fact = CpFact;

    fn is_forward(&self) -> bool {
        true
    }

    /// Integer parameters are unknown on entry.
    fn new_boundary_fact(&self, cfg: &Cfg) -> CpFact {
        cfg.params()
            .iter()
            .filter(|&&p| Self::can_hold_int(self.ir, p))
            .map(|&p| (p, Value::Nac))
            .collect()
    }

    fn new_initial_fact(&self) -> CpFact {
        CpFact::new()
    }

    fn meet_into(&self, fact: &CpFact, target: &mut CpFact) -> bool {
        let mut changed = false;
        for (var, value) in fact.iter() {
            changed |= target.update(var, Self::meet_value(value, target.get(var)));
        }
        changed
    }

    fn transfer_node(&self, stmt: &Stmt, input: &CpFact, output: &mut CpFact) -> bool {
        let def = match stmt.def() {
            Some(def) if Self::can_hold_int(self.ir, def) => def,
            _ => return output.copy_from(input),
        };

        let value = match stmt.rvalue() {
            Some(rvalue) => Self::evaluate(rvalue, input),
            // Call results are never known
            None => Value::Nac,
        };
        trace!("transfer [{}] {}: {} = {}", stmt.index(), stmt, def, value);

        let mut next = input.clone();
        next.update(def, value);
        output.copy_from(&next)
    }
}

/// Runs constant propagation on `cfg` with the default solver.
pub fn analyze_constants(cfg: &Cfg) -> DataflowResult<CpFact> {
    Solver::new().solve(&ConstantPropagation::new(cfg.ir()), cfg)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use proptest::prelude::*;
    use test_log::test;

    use super::*;
    use crate::ir::{LValue, StmtKind};
    use crate::types::Type;

    fn fact_le(a: &CpFact, b: &CpFact) -> bool {
        a.iter().all(|(var, value)| value.le(b.get(var)))
    }

    /// Fact {x0 = a, x1 = b} plus the binary expression `x0 op x1`.
    fn eval_pair(op: BinaryOp, a: Value, b: Value) -> Value {
        let x0 = Var::new(0);
        let x1 = Var::new(1);
        let fact: CpFact = [(x0, a), (x1, b)].into_iter().collect();
        ConstantPropagation::evaluate(&Exp::binary(op, x0, x1), &fact)
    }

    /// Reference semantics, computed in 64 bits and truncated.
    fn reference(op: BinaryOp, a: i32, b: i32) -> i32 {
        let a64 = a as i64;
        let b64 = b as i64;
        let sh = (b & 31) as u32;
        match op {
            BinaryOp::Add => (a64 + b64) as i32,
            BinaryOp::Sub => (a64 - b64) as i32,
            BinaryOp::Mul => (a64 * b64) as i32,
            BinaryOp::Div => (a64 / b64) as i32,
            BinaryOp::Rem => (a64 % b64) as i32,
            BinaryOp::Or => a | b,
            BinaryOp::And => a & b,
            BinaryOp::Xor => a ^ b,
            BinaryOp::Shl => ((a as u32) << sh) as i32,
            BinaryOp::Shr => a >> sh,
            BinaryOp::Ushr => ((a as u32) >> sh) as i32,
            BinaryOp::Eq => (a == b) as i32,
            BinaryOp::Ne => (a != b) as i32,
            BinaryOp::Lt => (a < b) as i32,
            BinaryOp::Le => (a <= b) as i32,
            BinaryOp::Gt => (a > b) as i32,
            BinaryOp::Ge => (a >= b) as i32,
        }
    }

    #[test]
    fn test_literal_and_var() {
        let x = Var::new(0);
        let fact: CpFact = [(x, Value::Constant(7))].into_iter().collect();
        assert_eq!(ConstantPropagation::evaluate(&Exp::IntLiteral(-3), &fact), Value::Constant(-3));
        assert_eq!(ConstantPropagation::evaluate(&Exp::Var(x), &fact), Value::Constant(7));
        assert_eq!(ConstantPropagation::evaluate(&Exp::Var(Var::new(9)), &fact), Value::Undef);
    }

    #[test]
    fn test_arithmetic_folding() {
        use Value::Constant as C;

        assert_eq!(eval_pair(BinaryOp::Add, C(2), C(3)), C(5));
        assert_eq!(eval_pair(BinaryOp::Sub, C(2), C(3)), C(-1));
        assert_eq!(eval_pair(BinaryOp::Mul, C(-4), C(3)), C(-12));
        assert_eq!(eval_pair(BinaryOp::Div, C(-7), C(2)), C(-3)); // Truncates toward zero
        assert_eq!(eval_pair(BinaryOp::Rem, C(-7), C(2)), C(-1));
        assert_eq!(eval_pair(BinaryOp::Add, C(i32::MAX), C(1)), C(i32::MIN)); // Wraps
        assert_eq!(eval_pair(BinaryOp::Div, C(i32::MIN), C(-1)), C(i32::MIN));
        assert_eq!(eval_pair(BinaryOp::Rem, C(i32::MIN), C(-1)), C(0));
    }

    #[test]
    fn test_shift_masking() {
        use Value::Constant as C;

        assert_eq!(eval_pair(BinaryOp::Shl, C(1), C(33)), C(2));
        assert_eq!(eval_pair(BinaryOp::Shl, C(1), C(-1)), C(i32::MIN));
        assert_eq!(eval_pair(BinaryOp::Shr, C(-8), C(1)), C(-4));
        assert_eq!(eval_pair(BinaryOp::Ushr, C(-8), C(28)), C(15));
        assert_eq!(eval_pair(BinaryOp::Ushr, C(-1), C(32)), C(-1));
    }

    #[test]
    fn test_conditions() {
        use Value::Constant as C;

        assert_eq!(eval_pair(BinaryOp::Eq, C(1), C(1)), C(1));
        assert_eq!(eval_pair(BinaryOp::Ne, C(1), C(1)), C(0));
        assert_eq!(eval_pair(BinaryOp::Lt, C(-1), C(0)), C(1));
        assert_eq!(eval_pair(BinaryOp::Le, C(0), C(0)), C(1));
        assert_eq!(eval_pair(BinaryOp::Gt, C(0), C(0)), C(0));
        assert_eq!(eval_pair(BinaryOp::Ge, C(-5), C(0)), C(0));
    }

    #[test]
    fn test_division_by_zero_is_undef() {
        use Value::*;

        for op in [BinaryOp::Div, BinaryOp::Rem] {
            assert_eq!(eval_pair(op, Constant(10), Constant(0)), Undef);
            assert_eq!(eval_pair(op, Nac, Constant(0)), Undef);
            assert_eq!(eval_pair(op, Undef, Constant(0)), Undef);
        }
        // Other operators with a zero operand are fine
        assert_eq!(eval_pair(BinaryOp::Mul, Nac, Constant(0)), Nac);
        assert_eq!(eval_pair(BinaryOp::Add, Constant(4), Constant(0)), Constant(4));
    }

    #[test]
    fn test_zero_divisor_wins_over_nac_dividend() {
        use Value::*;

        // A divisor rising from UNDEF to 0 lowers the result from NAC to UNDEF,
        // so `/` and `%` are the one place where evaluation is not monotone.
        assert_eq!(eval_pair(BinaryOp::Div, Nac, Undef), Nac);
        assert_eq!(eval_pair(BinaryOp::Div, Nac, Constant(0)), Undef);
    }

    #[test]
    fn test_nac_and_undef_operands() {
        use Value::*;

        assert_eq!(eval_pair(BinaryOp::Add, Nac, Constant(1)), Nac);
        assert_eq!(eval_pair(BinaryOp::Add, Undef, Nac), Nac);
        assert_eq!(eval_pair(BinaryOp::Add, Undef, Constant(1)), Undef);
        assert_eq!(eval_pair(BinaryOp::Add, Undef, Undef), Undef);
        assert_eq!(eval_pair(BinaryOp::Div, Constant(1), Nac), Nac);
    }

    #[test]
    fn test_opaque_expressions_are_nac() {
        let x = Var::new(0);
        let fact: CpFact = [(x, Value::Constant(1))].into_iter().collect();
        let opaque = [
            Exp::Neg(x),
            Exp::New("Object".to_string()),
            Exp::Cast { ty: Type::Int, value: x },
            Exp::InstanceOf { value: x, ty: Type::Reference },
            Exp::FieldAccess { base: None, field: "f".to_string() },
            Exp::ArrayAccess { base: x, index: x },
            Exp::ArrayLength(x),
        ];
        for exp in &opaque {
            assert_eq!(ConstantPropagation::evaluate(exp, &fact), Value::Nac, "{}", exp);
        }
    }

    #[test]
    fn test_boundary_fact_tracks_int_params_only() {
        let mut ir = Ir::new();
        let a = ir.new_param("a", Type::Int);
        let b = ir.new_param("b", Type::Reference);
        let c = ir.new_param("c", Type::Char);
        let d = ir.new_param("d", Type::Double);
        let local = ir.new_var("local", Type::Int);
        let cfg = Cfg::build(&ir).unwrap();

        let fact = ConstantPropagation::new(&ir).new_boundary_fact(&cfg);
        assert_eq!(fact.len(), 2);
        assert_eq!(fact.get(a), Value::Nac);
        assert_eq!(fact.get(c), Value::Nac);
        assert_eq!(fact.get(b), Value::Undef);
        assert_eq!(fact.get(d), Value::Undef);
        assert_eq!(fact.get(local), Value::Undef);
    }

    #[test]
    fn test_transfer() {
        let mut ir = Ir::new();
        let x = ir.new_var("x", Type::Int);
        let l = ir.new_var("l", Type::Long);
        let o = ir.new_var("o", Type::Reference);
        let s0 = ir.assign(x, Exp::IntLiteral(1));
        let s1 = ir.assign(l, Exp::IntLiteral(2));
        let s2 = ir.push(StmtKind::Invoke {
            result: Some(x),
            method: "next".to_string(),
            args: vec![],
        });
        let s3 = ir.push(StmtKind::Assign {
            lvalue: LValue::Field { base: Some(o), field: "f".to_string() },
            rvalue: Exp::Var(x),
        });
        let cp = ConstantPropagation::new(&ir);

        let input = CpFact::new();
        let mut out = CpFact::new();
        assert!(cp.transfer_node(ir.stmt(s0), &input, &mut out));
        assert_eq!(out.get(x), Value::Constant(1));
        assert!(!cp.transfer_node(ir.stmt(s0), &input, &mut out));

        // Long variables are not tracked
        let mut out = CpFact::new();
        assert!(!cp.transfer_node(ir.stmt(s1), &input, &mut out));
        assert_eq!(out.get(l), Value::Undef);

        // Call results are NAC
        let mut out = CpFact::new();
        assert!(cp.transfer_node(ir.stmt(s2), &input, &mut out));
        assert_eq!(out.get(x), Value::Nac);

        // Field stores pass the fact through
        let input: CpFact = [(x, Value::Constant(3))].into_iter().collect();
        let mut out = CpFact::new();
        assert!(cp.transfer_node(ir.stmt(s3), &input, &mut out));
        assert_eq!(out, input);
    }

    #[test]
    fn test_meet_into() {
        let ir = Ir::new();
        let cp = ConstantPropagation::new(&ir);
        let (x, y, z) = (Var::new(0), Var::new(1), Var::new(2));

        let fact: CpFact = [(x, Value::Constant(1)), (y, Value::Constant(2)), (z, Value::Nac)]
            .into_iter()
            .collect();
        let mut target: CpFact = [(x, Value::Constant(1)), (y, Value::Constant(3))].into_iter().collect();

        assert!(cp.meet_into(&fact, &mut target));
        assert_eq!(target.get(x), Value::Constant(1));
        assert_eq!(target.get(y), Value::Nac);
        assert_eq!(target.get(z), Value::Nac);
        assert!(!cp.meet_into(&fact, &mut target));
    }

    #[test]
    fn test_loop_makes_counter_nac() {
        // 0: i = 0
        // 1: one = 1
        // 2: c = 10
        // 3: if (i >= c) goto 6
        // 4: i = i + one
        // 5: goto 3
        // 6: return i
        let mut ir = Ir::new();
        let i = ir.new_var("i", Type::Int);
        let one = ir.new_var("one", Type::Int);
        let c = ir.new_var("c", Type::Int);
        ir.assign(i, Exp::IntLiteral(0));
        ir.assign(one, Exp::IntLiteral(1));
        ir.assign(c, Exp::IntLiteral(10));
        ir.push(StmtKind::If {
            cond: Exp::binary(BinaryOp::Ge, i, c),
            target: 6,
        });
        ir.assign(i, Exp::binary(BinaryOp::Add, i, one));
        ir.push(StmtKind::Goto { target: 3 });
        ir.push(StmtKind::Return(Some(i)));

        let cfg = Cfg::build(&ir).unwrap();
        let result = analyze_constants(&cfg);

        assert_eq!(result.in_fact(3).get(i), Value::Nac);
        assert_eq!(result.in_fact(3).get(one), Value::Constant(1));
        assert_eq!(result.in_fact(6).get(c), Value::Constant(10));
        assert_eq!(result.out_fact(0).get(i), Value::Constant(0));
    }

    #[test]
    fn test_undef_merges_to_constant() {
        // x is assigned on one branch only; the other path leaves it UNDEF
        // 0: if (p == p) goto 2
        // 1: x = 5
        // 2: return x
        let mut ir = Ir::new();
        let p = ir.new_param("p", Type::Int);
        let x = ir.new_var("x", Type::Int);
        ir.push(StmtKind::If {
            cond: Exp::binary(BinaryOp::Eq, p, p),
            target: 2,
        });
        ir.assign(x, Exp::IntLiteral(5));
        ir.push(StmtKind::Return(Some(x)));

        let cfg = Cfg::build(&ir).unwrap();
        let result = analyze_constants(&cfg);
        assert_eq!(result.in_fact(2).get(x), Value::Constant(5));
        assert_eq!(result.in_fact(2).get(p), Value::Nac);
    }

    proptest! {
        #[test]
        fn prop_evaluate_matches_native(op_idx in 0..BinaryOp::ALL.len(), a in any::<i32>(), b in any::<i32>()) {
            let op = BinaryOp::ALL[op_idx];
            let result = eval_pair(op, Value::Constant(a), Value::Constant(b));
            if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
                prop_assert_eq!(result, Value::Undef);
            } else {
                prop_assert_eq!(result, Value::Constant(reference(op, a, b)));
            }
        }

        #[test]
        fn prop_evaluate_is_monotone(op_idx in 0..BinaryOp::ALL.len(), a in -3i32..3, b in -3i32..3) {
            // Raising an operand to NAC never lowers the result
            let op = BinaryOp::ALL[op_idx];
            let precise = eval_pair(op, Value::Constant(a), Value::Constant(b));
            let lhs_nac = eval_pair(op, Value::Nac, Value::Constant(b));
            let rhs_nac = eval_pair(op, Value::Constant(a), Value::Nac);
            prop_assert!(precise.le(lhs_nac));
            prop_assert!(precise.le(rhs_nac));
        }
    }

    /// Wraps the analysis and checks that no node's OUT fact ever moves down.
    struct MonotonicityCheck<'ir> {
        inner: ConstantPropagation<'ir>,
        history: RefCell<HashMap<usize, CpFact>>,
    }

    impl DataflowAnalysis for MonotonicityCheck<'_> {
        type Fact = CpFact;

        fn is_forward(&self) -> bool {
            true
        }

        fn new_boundary_fact(&self, cfg: &Cfg) -> CpFact {
            self.inner.new_boundary_fact(cfg)
        }

        fn new_initial_fact(&self) -> CpFact {
            self.inner.new_initial_fact()
        }

        fn meet_into(&self, fact: &CpFact, target: &mut CpFact) -> bool {
            self.inner.meet_into(fact, target)
        }

        fn transfer_node(&self, stmt: &Stmt, input: &CpFact, output: &mut CpFact) -> bool {
            let changed = self.inner.transfer_node(stmt, input, output);
            let mut history = self.history.borrow_mut();
            if let Some(previous) = history.get(&stmt.index()) {
                assert!(
                    fact_le(previous, output),
                    "OUT of {} regressed: {} -> {}",
                    stmt.index(),
                    previous,
                    output
                );
            }
            history.insert(stmt.index(), output.clone());
            changed
        }
    }

    fn arb_body() -> impl Strategy<Value = Vec<(usize, u8, usize, usize, i32)>> {
        // (dst, kind, lhs, rhs, literal)
        prop::collection::vec((0usize..4, 0u8..3, 0usize..4, 0usize..4, -2i32..3), 1..10)
    }

    proptest! {
        #[test]
        fn prop_transfer_never_regresses(body in arb_body(), op_idx in 0..15usize, cond in (0usize..4, 0usize..4)) {
            let ops: Vec<BinaryOp> = BinaryOp::ALL
                .into_iter()
                .filter(|op| !matches!(op, BinaryOp::Div | BinaryOp::Rem))
                .collect();
            let mut ir = Ir::new();
            let p = ir.new_param("p", Type::Int);
            let xs: Vec<Var> = (0..4).map(|i| ir.new_var(format!("x{}", i), Type::Int)).collect();

            for &(dst, kind, lhs, rhs, literal) in &body {
                let rvalue = match kind {
                    0 => Exp::IntLiteral(literal),
                    1 => Exp::Var(p),
                    _ => Exp::binary(ops[op_idx], xs[lhs], xs[rhs]),
                };
                ir.assign(xs[dst], rvalue);
            }
            // Loop back to the start, then leave
            ir.push(StmtKind::If {
                cond: Exp::binary(BinaryOp::Lt, xs[cond.0], xs[cond.1]),
                target: 0,
            });
            ir.push(StmtKind::Return(None));

            let cfg = Cfg::build(&ir).unwrap();
            let analysis = MonotonicityCheck {
                inner: ConstantPropagation::new(&ir),
                history: RefCell::new(HashMap::new()),
            };
            let result = Solver::new().solve(&analysis, &cfg);

            // The result is a fixpoint: one more round changes nothing
            for node in cfg.nodes().filter(|&n| !cfg.is_entry(n)) {
                let mut out = result.out_fact(node).clone();
                prop_assert!(!analysis.inner.transfer_node(cfg.stmt(node), result.in_fact(node), &mut out));
            }
        }
    }
}
