//! Instruction selection: rewrites portable vector arithmetic and casts
//! into VPU intrinsic calls via the pattern tables, with node-specific
//! fallbacks the tables cannot express.

use std::sync::LazyLock;

use crate::analysis::substitute;
use crate::ir::expr::{bitwise_not, count_leading_zeros, max, BinOp, Expr, Stmt};
use crate::ir::matcher::{expr_match, MatchBindings, WILDCARD};
use crate::ir::mutate::{mutate_children, Mutator};
use crate::pass::engine::apply_patterns;
use crate::pass::Pass;
use crate::pass::tables::{
    i16, i16c, i32, i8, i8c, u16, u16c, u32, u8, u8c, wild_i16x, wild_i32x, wild_i8x, wild_u32x,
    wild_u8x, Pattern, ADDS, CASTS, MULS,
};
use crate::target::vpu_op;

/// `max(clz(x), clz(~x))` is the leading-sign count plus one. The table
/// engine cannot require the two `x` references to be equal, so these are
/// matched directly with an equality check on the bindings.
static CLS_PATTERNS: LazyLock<Vec<(&'static str, Expr)>> = LazyLock::new(|| {
    vec![
        (
            "vpu.cls.vh",
            max(
                count_leading_zeros(wild_i16x()),
                count_leading_zeros(bitwise_not(wild_i16x())),
            ),
        ),
        (
            "vpu.cls.vw",
            max(
                count_leading_zeros(wild_i32x()),
                count_leading_zeros(bitwise_not(wild_i32x())),
            ),
        ),
    ]
});

/// Double casts restated as two chained half-width stages, so the cast
/// table sees shapes it knows. Without these, a 4x-ratio cast falls
/// through to the generic lowering and produces large unoptimized lane
/// shuffles.
static CAST_REWRITES: LazyLock<Vec<(Expr, Expr)>> = LazyLock::new(|| {
    vec![
        // Saturating narrowing.
        (u8c(wild_u32x()), u8c(u16c(wild_u32x()))),
        (u8c(wild_i32x()), u8c(i16c(wild_i32x()))),
        (i8c(wild_u32x()), i8c(u16c(wild_u32x()))),
        (i8c(wild_i32x()), i8c(i16c(wild_i32x()))),
        // Narrowing.
        (u8(wild_u32x()), u8(u16(wild_u32x()))),
        (u8(wild_i32x()), u8(i16(wild_i32x()))),
        (i8(wild_u32x()), i8(u16(wild_u32x()))),
        (i8(wild_i32x()), i8(i16(wild_i32x()))),
        // Widening.
        (u32(wild_u8x()), u32(u16(wild_u8x()))),
        (u32(wild_i8x()), u32(i16(wild_i8x()))),
        (i32(wild_u8x()), i32(u16(wild_u8x()))),
        (i32(wild_i8x()), i32(i16(wild_i8x()))),
    ]
});

/// Rewrites template wildcard lane counts (0) to a concrete count.
struct WithLanes {
    lanes: u32,
}

impl Mutator for WithLanes {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e {
            Expr::Cast { ty, value } if ty.lanes != self.lanes => {
                Expr::cast(ty.with_lanes(self.lanes), self.mutate_expr(value))
            }
            Expr::Var { name, ty } if ty.lanes != self.lanes => {
                Expr::var(name.clone(), ty.with_lanes(self.lanes))
            }
            Expr::Broadcast { value, lanes } if *lanes != self.lanes => {
                Expr::broadcast((**value).clone(), self.lanes)
            }
            _ => mutate_children(self, e),
        }
    }
}

fn with_lanes(e: &Expr, lanes: u32) -> Expr {
    WithLanes { lanes }.mutate_expr(e)
}

fn negate_const(e: &Expr) -> Option<Expr> {
    match e {
        Expr::IntImm { value, ty } if ty.can_hold(-value) => Some(Expr::int(-value, *ty)),
        Expr::Broadcast { value, lanes } => {
            negate_const(value).map(|v| Expr::broadcast(v, *lanes))
        }
        _ => None,
    }
}

/// A provably value-preserving negation of `e`: a negatable constant, or
/// a product with one negatable factor. `None` when no proof exists;
/// callers must fall back, never fabricate.
fn lossless_negate(e: &Expr) -> Option<Expr> {
    if let Expr::Binary {
        op: BinOp::Mul,
        a,
        b,
    } = e
    {
        if let Some(na) = lossless_negate(a) {
            return Some(Expr::binary(BinOp::Mul, na, (**b).clone()));
        }
        if let Some(nb) = lossless_negate(b) {
            return Some(Expr::binary(BinOp::Mul, (**a).clone(), nb));
        }
    }
    negate_const(e)
}

/// The instruction selection pass.
pub struct SelectInstructions;

impl Pass for SelectInstructions {
    fn name(&self) -> &'static str {
        "select-instructions"
    }

    fn run(&mut self, body: &Stmt) -> Stmt {
        self.mutate_stmt(body)
    }
}

impl SelectInstructions {
    fn visit_commutative(&mut self, e: &Expr, op: BinOp, a: &Expr, b: &Expr, table: &[Pattern]) -> Expr {
        let rewritten = apply_patterns(e, table, self);
        if rewritten != *e {
            return rewritten;
        }
        let commuted = Expr::binary(op, b.clone(), a.clone());
        let rewritten = apply_patterns(&commuted, table, self);
        if rewritten != commuted {
            return rewritten;
        }
        mutate_children(self, e)
    }
}

impl Mutator for SelectInstructions {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e {
            Expr::Binary {
                op: op @ (BinOp::Mul | BinOp::Add),
                a,
                b,
            } if e.ty().is_vector() => {
                let table: &[Pattern] = if *op == BinOp::Mul { &MULS } else { &ADDS };
                self.visit_commutative(e, *op, a, b, table)
            }
            Expr::Binary {
                op: BinOp::Sub,
                a,
                b,
            } if e.ty().is_vector() => {
                // a - b is a + (-b) when the negation is provable, which
                // unlocks the multiply-accumulate patterns.
                if let Some(neg_b) = lossless_negate(b) {
                    let add = Expr::binary(BinOp::Add, (**a).clone(), neg_b.clone());
                    let rewritten = apply_patterns(&add, &ADDS, self);
                    if rewritten != add {
                        return rewritten;
                    }
                    let add = Expr::binary(BinOp::Add, neg_b, (**a).clone());
                    let rewritten = apply_patterns(&add, &ADDS, self);
                    if rewritten != add {
                        return rewritten;
                    }
                }
                mutate_children(self, e)
            }
            Expr::Binary { op: BinOp::Max, .. } => {
                let e = mutate_children(self, e);
                if e.ty().is_vector() {
                    let mut bindings = MatchBindings::new();
                    for (intrin, template) in CLS_PATTERNS.iter() {
                        if expr_match(template, &e, &mut bindings) && bindings[0] == bindings[1] {
                            return vpu_op(e.ty(), intrin, vec![bindings[0].clone()]) + 1;
                        }
                    }
                }
                e
            }
            Expr::Cast { ty, .. } if ty.is_vector() => {
                let rewritten = apply_patterns(e, &CASTS, self);
                if rewritten != *e {
                    return rewritten;
                }
                let mut bindings = MatchBindings::new();
                for (from, to) in CAST_REWRITES.iter() {
                    if expr_match(from, e, &mut bindings) {
                        let staged = with_lanes(to, ty.lanes);
                        let staged = substitute(WILDCARD, &bindings[0], &staged);
                        // Each stage gets a fresh shot at the table.
                        return self.mutate_expr(&staged);
                    }
                }
                mutate_children(self, e)
            }
            _ => mutate_children(self, e),
        }
    }
}
