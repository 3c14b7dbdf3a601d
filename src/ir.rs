//! Three-address intermediate representation of a single procedure.
//!
//! A procedure is a flat list of [`Stmt`]s indexed from zero. Jumps refer to
//! their targets by statement index; the [`Cfg`][crate::cfg::Cfg] builder turns
//! those indices into edges.
//!
//! Operands of binary expressions are always variables, so every intermediate
//! value gets a name and a [`Type`]:
//!
//! ```
//! use dataflow_rs::ir::{BinaryOp, Exp, Ir, StmtKind};
//! use dataflow_rs::types::Type;
//!
//! let mut ir = Ir::new();
//! let a = ir.new_param("a", Type::Int);
//! let one = ir.new_var("one", Type::Int);
//! let b = ir.new_var("b", Type::Int);
//!
//! ir.assign(one, Exp::IntLiteral(1));
//! ir.assign(b, Exp::binary(BinaryOp::Add, a, one));
//! ir.push(StmtKind::Return(Some(b)));
//!
//! assert_eq!(ir.len(), 3);
//! assert_eq!(ir.stmt(1).def(), Some(b));
//! ```

use std::fmt;

use crate::types::{Type, Var};

/// Binary operator of a three-address expression.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    // Bitwise
    Or,
    And,
    Xor,
    // Shift
    Shl,
    Shr,
    Ushr,
    // Condition
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 17] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
        BinaryOp::Or,
        BinaryOp::And,
        BinaryOp::Xor,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::Ushr,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
    ];

    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::Or | BinaryOp::And | BinaryOp::Xor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr)
    }

    /// Relational operators, the only ones allowed in an `if` condition.
    pub fn is_condition(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Or => "|",
            BinaryOp::And => "&",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Right-hand side expression.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Exp {
    /// Integer literal
    IntLiteral(i32),
    /// Variable read
    Var(Var),
    /// Binary expression: lhs op rhs
    Binary { op: BinaryOp, lhs: Var, rhs: Var },
    /// Arithmetic negation: -v
    Neg(Var),
    /// Object allocation: new T
    New(String),
    /// Type cast: (T) v
    Cast { ty: Type, value: Var },
    /// Type test: v instanceof T
    InstanceOf { value: Var, ty: Type },
    /// Field read: base.field, or a static field when `base` is None
    FieldAccess { base: Option<Var>, field: String },
    /// Array element read: base[index]
    ArrayAccess { base: Var, index: Var },
    /// Array length: base.length
    ArrayLength(Var),
}

impl Exp {
    pub fn binary(op: BinaryOp, lhs: Var, rhs: Var) -> Self {
        Exp::Binary { op, lhs, rhs }
    }

    /// Variables read by this expression.
    pub fn uses(&self) -> Vec<Var> {
        match self {
            Exp::IntLiteral(_) | Exp::New(_) => vec![],
            Exp::Var(v) | Exp::Neg(v) | Exp::ArrayLength(v) => vec![*v],
            Exp::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Exp::Cast { value, .. } | Exp::InstanceOf { value, .. } => vec![*value],
            Exp::FieldAccess { base, .. } => base.iter().copied().collect(),
            Exp::ArrayAccess { base, index } => vec![*base, *index],
        }
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exp::IntLiteral(n) => write!(f, "{}", n),
            Exp::Var(v) => write!(f, "{}", v),
            Exp::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Exp::Neg(v) => write!(f, "-{}", v),
            Exp::New(class) => write!(f, "new {}", class),
            Exp::Cast { ty, value } => write!(f, "({}) {}", ty, value),
            Exp::InstanceOf { value, ty } => write!(f, "{} instanceof {}", value, ty),
            Exp::FieldAccess { base: Some(base), field } => write!(f, "{}.{}", base, field),
            Exp::FieldAccess { base: None, field } => write!(f, "<static>.{}", field),
            Exp::ArrayAccess { base, index } => write!(f, "{}[{}]", base, index),
            Exp::ArrayLength(v) => write!(f, "{}.length", v),
        }
    }
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum LValue {
    Var(Var),
    Field { base: Option<Var>, field: String },
    Array { base: Var, index: Var },
}

impl fmt::Display for LValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LValue::Var(v) => write!(f, "{}", v),
            LValue::Field { base: Some(base), field } => write!(f, "{}.{}", base, field),
            LValue::Field { base: None, field } => write!(f, "<static>.{}", field),
            LValue::Array { base, index } => write!(f, "{}[{}]", base, index),
        }
    }
}

/// Statement kind.
///
/// Jump targets are statement indices within the same [`Ir`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StmtKind {
    /// No-op (also used for the synthetic entry and exit nodes)
    Nop,
    /// Assignment: lvalue = rvalue
    Assign { lvalue: LValue, rvalue: Exp },
    /// Unconditional jump
    Goto { target: usize },
    /// Conditional jump to `target` when `cond` holds, fall through otherwise
    If { cond: Exp, target: usize },
    /// Multi-way jump on the value of `var`
    Switch {
        var: Var,
        cases: Vec<(i32, usize)>,
        default: usize,
    },
    /// Method call, optionally storing its result
    Invoke {
        result: Option<Var>,
        method: String,
        args: Vec<Var>,
    },
    /// Return from the procedure
    Return(Option<Var>),
}

/// A statement together with its position in the procedure.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Stmt {
    index: usize,
    kind: StmtKind,
}

impl Stmt {
    pub fn new(index: usize, kind: StmtKind) -> Self {
        Self { index, kind }
    }

    /// Position in the procedure; the total order used for result sets.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> &StmtKind {
        &self.kind
    }

    /// Variable defined by this statement, if any.
    ///
    /// Stores into fields and array elements define no variable.
    pub fn def(&self) -> Option<Var> {
        match &self.kind {
            StmtKind::Assign {
                lvalue: LValue::Var(v), ..
            } => Some(*v),
            StmtKind::Invoke { result, .. } => *result,
            _ => None,
        }
    }

    /// Right-hand side of an assignment. Calls have none: their result is opaque.
    pub fn rvalue(&self) -> Option<&Exp> {
        match &self.kind {
            StmtKind::Assign { rvalue, .. } => Some(rvalue),
            _ => None,
        }
    }

    /// Variables read by this statement.
    pub fn uses(&self) -> Vec<Var> {
        match &self.kind {
            StmtKind::Nop | StmtKind::Goto { .. } | StmtKind::Return(None) => vec![],
            StmtKind::Assign { lvalue, rvalue } => {
                let mut uses = rvalue.uses();
                match lvalue {
                    LValue::Var(_) => {}
                    LValue::Field { base, .. } => uses.extend(base.iter().copied()),
                    LValue::Array { base, index } => uses.extend([*base, *index]),
                }
                uses
            }
            StmtKind::If { cond, .. } => cond.uses(),
            StmtKind::Switch { var, .. } => vec![*var],
            StmtKind::Invoke { args, .. } => args.clone(),
            StmtKind::Return(Some(v)) => vec![*v],
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::Nop => write!(f, "nop"),
            StmtKind::Assign { lvalue, rvalue } => write!(f, "{} = {}", lvalue, rvalue),
            StmtKind::Goto { target } => write!(f, "goto {}", target),
            StmtKind::If { cond, target } => write!(f, "if ({}) goto {}", cond, target),
            StmtKind::Switch { var, cases, default } => {
                write!(f, "switch ({}) {{", var)?;
                for (value, target) in cases {
                    write!(f, " case {}: goto {};", value, target)?;
                }
                write!(f, " default: goto {}; }}", default)
            }
            StmtKind::Invoke { result, method, args } => {
                if let Some(result) = result {
                    write!(f, "{} = ", result)?;
                }
                write!(f, "invoke {}(", method)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            StmtKind::Return(Some(v)) => write!(f, "return {}", v),
            StmtKind::Return(None) => write!(f, "return"),
        }
    }
}

#[derive(Debug, Clone)]
struct VarInfo {
    name: String,
    ty: Type,
}

/// Body of one procedure: variable table, parameters and statements.
#[derive(Debug, Clone, Default)]
pub struct Ir {
    vars: Vec<VarInfo>,
    params: Vec<Var>,
    stmts: Vec<Stmt>,
}

impl Ir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new local variable.
    pub fn new_var(&mut self, name: impl Into<String>, ty: Type) -> Var {
        let var = Var::new(self.vars.len() as u32);
        self.vars.push(VarInfo { name: name.into(), ty });
        var
    }

    /// Allocates a new variable and registers it as a parameter.
    pub fn new_param(&mut self, name: impl Into<String>, ty: Type) -> Var {
        let var = self.new_var(name, ty);
        self.params.push(var);
        var
    }

    /// Appends a statement and returns its index.
    pub fn push(&mut self, kind: StmtKind) -> usize {
        let index = self.stmts.len();
        self.stmts.push(Stmt::new(index, kind));
        index
    }

    /// Appends `var = rvalue` and returns its index.
    pub fn assign(&mut self, var: Var, rvalue: Exp) -> usize {
        self.push(StmtKind::Assign {
            lvalue: LValue::Var(var),
            rvalue,
        })
    }

    /// Replaces the kind of an already pushed statement.
    ///
    /// Handy for patching forward jump targets.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn set_kind(&mut self, index: usize, kind: StmtKind) {
        self.stmts[index].kind = kind;
    }

    pub fn params(&self) -> &[Var] {
        &self.params
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn stmt(&self, index: usize) -> &Stmt {
        &self.stmts[index]
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        (0..self.vars.len()).map(|i| Var::new(i as u32))
    }

    pub fn var_name(&self, var: Var) -> &str {
        &self.vars[var.index()].name
    }

    pub fn var_type(&self, var: Var) -> Type {
        self.vars[var.index()].ty
    }
}
