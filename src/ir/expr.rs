//! The immutable typed expression and statement trees the optimizer
//! rewrites. Nodes are plain enums with owned children; passes never
//! mutate in place, they rebuild.

use crate::internal_error;
use crate::ir::types::Type;

/// Binary operations. Comparisons and logical ops yield the 1-bit
/// unsigned (boolean) element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// Integer division, rounding toward negative infinity.
    Div,
    /// Modulo with the sign of the divisor (euclidean for positive divisors).
    Mod,
    Min,
    Max,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// True for ops whose result element type is boolean.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinOp::Eq
                | BinOp::Ne
                | BinOp::Lt
                | BinOp::Le
                | BinOp::Gt
                | BinOp::Ge
                | BinOp::And
                | BinOp::Or
        )
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Min => "min",
            BinOp::Max => "max",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        f.write_str(s)
    }
}

/// How a call is lowered downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallClass {
    /// A target intrinsic, lowered verbatim to one machine instruction.
    Extern,
    /// A portable intrinsic the code generator knows how to open-code
    /// (bitwise ops, shifts, abs, ...).
    Intrinsic,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    IntImm {
        value: i64,
        ty: Type,
    },
    Var {
        name: String,
        ty: Type,
    },
    Cast {
        ty: Type,
        value: Box<Expr>,
    },
    Binary {
        op: BinOp,
        a: Box<Expr>,
        b: Box<Expr>,
    },
    Not {
        a: Box<Expr>,
    },
    Select {
        cond: Box<Expr>,
        true_value: Box<Expr>,
        false_value: Box<Expr>,
    },
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    /// A load of `ty.lanes` elements from buffer `name` at per-lane
    /// indices `index` (a vector expression, or a scalar for lanes == 1).
    Load {
        ty: Type,
        name: String,
        index: Box<Expr>,
    },
    /// A scalar replicated across `lanes` lanes.
    Broadcast {
        value: Box<Expr>,
        lanes: u32,
    },
    /// The affine vector `base + stride * [0, 1, ..., lanes-1]`.
    Ramp {
        base: Box<Expr>,
        stride: Box<Expr>,
        lanes: u32,
    },
    Call {
        ty: Type,
        name: String,
        class: CallClass,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn int(value: i64, ty: Type) -> Expr {
        Expr::IntImm { value, ty }
    }

    pub fn var(name: impl Into<String>, ty: Type) -> Expr {
        Expr::Var {
            name: name.into(),
            ty,
        }
    }

    pub fn cast(ty: Type, value: Expr) -> Expr {
        Expr::Cast {
            ty,
            value: Box::new(value),
        }
    }

    /// Builds a binary node. A scalar operand is broadcast to the other
    /// operand's lane count; mismatched vector lane counts are a
    /// construction bug.
    pub fn binary(op: BinOp, a: Expr, b: Expr) -> Expr {
        let (a, b) = promote_lanes(a, b);
        Expr::Binary {
            op,
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    pub fn not(a: Expr) -> Expr {
        Expr::Not { a: Box::new(a) }
    }

    pub fn select(cond: Expr, true_value: Expr, false_value: Expr) -> Expr {
        Expr::Select {
            cond: Box::new(cond),
            true_value: Box::new(true_value),
            false_value: Box::new(false_value),
        }
    }

    pub fn let_in(name: impl Into<String>, value: Expr, body: Expr) -> Expr {
        Expr::Let {
            name: name.into(),
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    pub fn load(ty: Type, name: impl Into<String>, index: Expr) -> Expr {
        Expr::Load {
            ty,
            name: name.into(),
            index: Box::new(index),
        }
    }

    pub fn broadcast(value: Expr, lanes: u32) -> Expr {
        Expr::Broadcast {
            value: Box::new(value),
            lanes,
        }
    }

    pub fn ramp(base: Expr, stride: Expr, lanes: u32) -> Expr {
        Expr::Ramp {
            base: Box::new(base),
            stride: Box::new(stride),
            lanes,
        }
    }

    pub fn call(ty: Type, name: impl Into<String>, class: CallClass, args: Vec<Expr>) -> Expr {
        Expr::Call {
            ty,
            name: name.into(),
            class,
            args,
        }
    }

    /// The type of this expression, computed structurally.
    pub fn ty(&self) -> Type {
        match self {
            Expr::IntImm { ty, .. } => *ty,
            Expr::Var { ty, .. } => *ty,
            Expr::Cast { ty, .. } => *ty,
            Expr::Binary { op, a, .. } => {
                let t = a.ty();
                if op.is_boolean() {
                    Type::bool_type().with_lanes(t.lanes)
                } else {
                    t
                }
            }
            Expr::Not { a } => a.ty(),
            Expr::Select { true_value, .. } => true_value.ty(),
            Expr::Let { body, .. } => body.ty(),
            Expr::Load { ty, .. } => *ty,
            Expr::Broadcast { value, lanes } => value.ty().with_lanes(*lanes),
            Expr::Ramp { base, lanes, .. } => base.ty().with_lanes(*lanes),
            Expr::Call { ty, .. } => *ty,
        }
    }

    pub fn lanes(&self) -> u32 {
        self.ty().lanes
    }
}

/// Broadcasts a scalar operand to match the other operand's lane count.
/// Lane count 0 (template wildcard) counts as a vector.
fn promote_lanes(a: Expr, b: Expr) -> (Expr, Expr) {
    let (la, lb) = (a.ty().lanes, b.ty().lanes);
    if la == lb {
        (a, b)
    } else if la == 1 {
        let lanes = lb;
        (Expr::broadcast(a, lanes), b)
    } else if lb == 1 {
        let lanes = la;
        (a, Expr::broadcast(b, lanes))
    } else {
        internal_error!("lane mismatch in binary op: {} vs {}", la, lb);
    }
}

// Operator overloads so pattern templates and rewrites read like the
// arithmetic they describe. Only used at construction time.

impl std::ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Add, self, rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Sub, self, rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Mul, self, rhs)
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Div, self, rhs)
    }
}

impl std::ops::Rem for Expr {
    type Output = Expr;
    fn rem(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Mod, self, rhs)
    }
}

impl std::ops::Add<i64> for Expr {
    type Output = Expr;
    fn add(self, rhs: i64) -> Expr {
        let imm = Expr::int(rhs, self.ty().element_of());
        Expr::binary(BinOp::Add, self, imm)
    }
}

impl std::ops::Sub<i64> for Expr {
    type Output = Expr;
    fn sub(self, rhs: i64) -> Expr {
        let imm = Expr::int(rhs, self.ty().element_of());
        Expr::binary(BinOp::Sub, self, imm)
    }
}

impl std::ops::Div<i64> for Expr {
    type Output = Expr;
    fn div(self, rhs: i64) -> Expr {
        let imm = Expr::int(rhs, self.ty().element_of());
        Expr::binary(BinOp::Div, self, imm)
    }
}

pub fn min(a: Expr, b: Expr) -> Expr {
    Expr::binary(BinOp::Min, a, b)
}

pub fn max(a: Expr, b: Expr) -> Expr {
    Expr::binary(BinOp::Max, a, b)
}

/// `min(max(x, lo), hi)`.
pub fn clamp(x: Expr, lo: Expr, hi: Expr) -> Expr {
    min(max(x, lo), hi)
}

// ---------------------------------------------------------------------------
// Portable intrinsics
// ---------------------------------------------------------------------------

// Bitwise ops and shifts are opaque calls the code generator open-codes;
// keeping them out of `BinOp` keeps the arithmetic enum closed over the
// ops the pattern tables reason about algebraically.

fn intrinsic2(name: &str, a: Expr, b: Expr) -> Expr {
    let (a, b) = promote_lanes(a, b);
    let ty = a.ty();
    Expr::call(ty, name, CallClass::Intrinsic, vec![a, b])
}

fn intrinsic1(name: &str, a: Expr) -> Expr {
    let ty = a.ty();
    Expr::call(ty, name, CallClass::Intrinsic, vec![a])
}

pub fn shift_left(a: Expr, b: Expr) -> Expr {
    intrinsic2("shift_left", a, b)
}

pub fn shift_right(a: Expr, b: Expr) -> Expr {
    intrinsic2("shift_right", a, b)
}

pub fn bitwise_and(a: Expr, b: Expr) -> Expr {
    intrinsic2("bitwise_and", a, b)
}

pub fn bitwise_or(a: Expr, b: Expr) -> Expr {
    intrinsic2("bitwise_or", a, b)
}

pub fn bitwise_xor(a: Expr, b: Expr) -> Expr {
    intrinsic2("bitwise_xor", a, b)
}

pub fn bitwise_not(a: Expr) -> Expr {
    intrinsic1("bitwise_not", a)
}

pub fn abs(a: Expr) -> Expr {
    intrinsic1("abs", a)
}

/// Absolute difference: `|a - b|` without intermediate overflow.
pub fn absd(a: Expr, b: Expr) -> Expr {
    intrinsic2("absd", a, b)
}

pub fn count_leading_zeros(a: Expr) -> Expr {
    intrinsic1("count_leading_zeros", a)
}

// ---------------------------------------------------------------------------
// Constant predicates
// ---------------------------------------------------------------------------

/// The constant value of an integer immediate or a broadcast of one.
pub fn as_const_int(e: &Expr) -> Option<i64> {
    match e {
        Expr::IntImm { value, .. } => Some(*value),
        Expr::Broadcast { value, .. } => as_const_int(value),
        _ => None,
    }
}

pub fn is_zero(e: &Expr) -> bool {
    as_const_int(e) == Some(0)
}

pub fn is_one(e: &Expr) -> bool {
    as_const_int(e) == Some(1)
}

/// If `e` is a positive compile-time power of two, its exact log base 2.
pub fn is_const_power_of_two(e: &Expr) -> Option<u32> {
    let v = as_const_int(e)?;
    if v > 0 && (v & (v - 1)) == 0 {
        Some(v.trailing_zeros())
    } else {
        None
    }
}

pub fn is_positive_const(e: &Expr) -> bool {
    matches!(as_const_int(e), Some(v) if v > 0)
}

/// True for a negative constant whose negation is representable in the
/// constant's own type.
pub fn is_negative_negatable_const(e: &Expr) -> bool {
    match (as_const_int(e), e.ty()) {
        (Some(v), ty) => v < 0 && ty.element_of().can_hold(-v),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Variable use queries
// ---------------------------------------------------------------------------

/// True if `e` contains a free reference to `name`. Let bindings of the
/// same name shadow it.
pub fn expr_uses_var(e: &Expr, name: &str) -> bool {
    match e {
        Expr::IntImm { .. } => false,
        Expr::Var { name: n, .. } => n == name,
        Expr::Cast { value, .. } => expr_uses_var(value, name),
        Expr::Binary { a, b, .. } => expr_uses_var(a, name) || expr_uses_var(b, name),
        Expr::Not { a } => expr_uses_var(a, name),
        Expr::Select {
            cond,
            true_value,
            false_value,
        } => {
            expr_uses_var(cond, name)
                || expr_uses_var(true_value, name)
                || expr_uses_var(false_value, name)
        }
        Expr::Let {
            name: bound,
            value,
            body,
        } => {
            expr_uses_var(value, name) || (bound != name && expr_uses_var(body, name))
        }
        Expr::Load { index, .. } => expr_uses_var(index, name),
        Expr::Broadcast { value, .. } => expr_uses_var(value, name),
        Expr::Ramp { base, stride, .. } => {
            expr_uses_var(base, name) || expr_uses_var(stride, name)
        }
        Expr::Call { args, .. } => args.iter().any(|a| expr_uses_var(a, name)),
    }
}

pub fn stmt_uses_var(s: &Stmt, name: &str) -> bool {
    match s {
        Stmt::LetStmt {
            name: bound,
            value,
            body,
        } => expr_uses_var(value, name) || (bound != name && stmt_uses_var(body, name)),
        Stmt::For {
            var,
            min,
            extent,
            body,
        } => {
            expr_uses_var(min, name)
                || expr_uses_var(extent, name)
                || (var != name && stmt_uses_var(body, name))
        }
        Stmt::Store { index, value, .. } => {
            expr_uses_var(index, name) || expr_uses_var(value, name)
        }
        Stmt::Evaluate(e) => expr_uses_var(e, name),
        Stmt::Block(stmts) => stmts.iter().any(|s| stmt_uses_var(s, name)),
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// A statement node. Function bodies are statements; only the let
/// statement carries optimizer-relevant scope structure, the rest exist so
/// realistic bodies (loops of stores) can be walked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    LetStmt {
        name: String,
        value: Expr,
        body: Box<Stmt>,
    },
    For {
        var: String,
        min: Expr,
        extent: Expr,
        body: Box<Stmt>,
    },
    Store {
        name: String,
        index: Expr,
        value: Expr,
    },
    Evaluate(Expr),
    Block(Vec<Stmt>),
}

impl Stmt {
    pub fn let_stmt(name: impl Into<String>, value: Expr, body: Stmt) -> Stmt {
        Stmt::LetStmt {
            name: name.into(),
            value,
            body: Box::new(body),
        }
    }

    pub fn for_loop(var: impl Into<String>, min: Expr, extent: Expr, body: Stmt) -> Stmt {
        Stmt::For {
            var: var.into(),
            min,
            extent,
            body: Box::new(body),
        }
    }

    pub fn store(name: impl Into<String>, index: Expr, value: Expr) -> Stmt {
        Stmt::Store {
            name: name.into(),
            index,
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Pretty printing
// ---------------------------------------------------------------------------

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::IntImm { value, .. } => write!(f, "{}", value),
            Expr::Var { name, .. } => write!(f, "{}", name),
            Expr::Cast { ty, value } => write!(f, "{}({})", ty, value),
            Expr::Binary { op, a, b } => match op {
                BinOp::Min | BinOp::Max => write!(f, "{}({}, {})", op, a, b),
                _ => write!(f, "({} {} {})", a, op, b),
            },
            Expr::Not { a } => write!(f, "!{}", a),
            Expr::Select {
                cond,
                true_value,
                false_value,
            } => write!(f, "select({}, {}, {})", cond, true_value, false_value),
            Expr::Let { name, value, body } => {
                write!(f, "(let {} = {} in {})", name, value, body)
            }
            Expr::Load { name, index, .. } => write!(f, "{}[{}]", name, index),
            Expr::Broadcast { value, lanes } => write!(f, "x{}({})", lanes, value),
            Expr::Ramp {
                base,
                stride,
                lanes,
            } => write!(f, "ramp({}, {}, {})", base, stride, lanes),
            Expr::Call { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl std::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::LetStmt { name, value, body } => {
                writeln!(f, "let {} = {}", name, value)?;
                write!(f, "{}", body)
            }
            Stmt::For {
                var,
                min,
                extent,
                body,
            } => {
                writeln!(f, "for {} in [{}, {} + {}) {{", var, min, min, extent)?;
                writeln!(f, "{}", body)?;
                write!(f, "}}")
            }
            Stmt::Store { name, index, value } => {
                write!(f, "{}[{}] = {}", name, index, value)
            }
            Stmt::Evaluate(e) => write!(f, "{}", e),
            Stmt::Block(stmts) => {
                for (i, s) in stmts.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", s)?;
                }
                Ok(())
            }
        }
    }
}
