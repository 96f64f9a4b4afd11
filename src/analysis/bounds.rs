//! Conservative value-range inference for index expressions.
//!
//! Bounds are scalar expressions covering every lane of a vector value.
//! `None` means unbounded on that side. Unbounded results of narrow
//! integer type (at most 16 bits) fall back to the type's own range,
//! which is what makes byte-indexed lookup tables recognizable.

use crate::ir::expr::{as_const_int, BinOp, Expr};
use crate::ir::scope::Scope;
use crate::ir::types::Type;

/// A conservative `[min, max]` range. Either side may be unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub min: Option<Expr>,
    pub max: Option<Expr>,
}

impl Interval {
    pub fn point(e: Expr) -> Interval {
        Interval {
            min: Some(e.clone()),
            max: Some(e),
        }
    }

    pub fn unbounded() -> Interval {
        Interval {
            min: None,
            max: None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }
}

/// The value range of one element of `ty`, if the type is a narrow
/// integer. Wider types are too large to be worth tabulating.
fn bounds_of_type(ty: Type) -> Interval {
    let elem = ty.element_of();
    if (elem.is_int() || elem.is_uint()) && elem.bits <= 16 {
        match (elem.min_value(), elem.max_value()) {
            (Some(lo), Some(hi)) => Interval {
                min: Some(Expr::int(lo, elem)),
                max: Some(Expr::int(hi, elem)),
            },
            _ => Interval::unbounded(),
        }
    } else {
        Interval::unbounded()
    }
}

fn binop_ends(op: BinOp, a: &Option<Expr>, b: &Option<Expr>) -> Option<Expr> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Expr::binary(op, a.clone(), b.clone())),
        _ => None,
    }
}

/// `min` of the available bounds. One known bound suffices: sound only
/// where an unknown side acts as positive infinity (the upper end of a
/// `min`, the lower end of a `max`).
fn either_min(a: &Option<Expr>, b: &Option<Expr>) -> Option<Expr> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Expr::binary(BinOp::Min, a.clone(), b.clone())),
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    }
}

fn either_max(a: &Option<Expr>, b: &Option<Expr>) -> Option<Expr> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Expr::binary(BinOp::Max, a.clone(), b.clone())),
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    }
}

/// Computes a conservative interval for `e` given intervals for the
/// let-bound vector names in `scope`. Lets encountered inside `e` extend
/// the scope for the duration of their body.
pub fn bounds_of_expr_in_scope(e: &Expr, scope: &mut Scope<Interval>) -> Interval {
    let interval = bounds_of_expr(e, scope);
    if interval.is_bounded() {
        return interval;
    }
    // Unbounded narrow-typed values still have their type's range.
    let fallback = bounds_of_type(e.ty());
    Interval {
        min: interval.min.or(fallback.min),
        max: interval.max.or(fallback.max),
    }
}

fn bounds_of_expr(e: &Expr, scope: &mut Scope<Interval>) -> Interval {
    match e {
        Expr::IntImm { .. } => Interval::point(e.clone()),
        Expr::Var { name, ty } => match scope.get(name) {
            Some(interval) => interval.clone(),
            // A free scalar holds a single value per evaluation, so it is
            // its own exact bound. Vector lanes differ, so vectors stay
            // unbounded.
            None if ty.is_scalar() => Interval::point(e.clone()),
            None => Interval::unbounded(),
        },
        Expr::Cast { ty, value } => {
            if !ty.can_represent(value.ty()) {
                return Interval::unbounded();
            }
            let inner = bounds_of_expr_in_scope(value, scope);
            let elem = ty.element_of();
            Interval {
                min: inner.min.map(|m| Expr::cast(elem, m)),
                max: inner.max.map(|m| Expr::cast(elem, m)),
            }
        }
        Expr::Binary { op, a, b } => {
            if op.is_boolean() {
                let bool_ty = Type::bool_type();
                return Interval {
                    min: Some(Expr::int(0, bool_ty)),
                    max: Some(Expr::int(1, bool_ty)),
                };
            }
            let ia = bounds_of_expr_in_scope(a, scope);
            let ib = bounds_of_expr_in_scope(b, scope);
            match op {
                BinOp::Add => Interval {
                    min: binop_ends(BinOp::Add, &ia.min, &ib.min),
                    max: binop_ends(BinOp::Add, &ia.max, &ib.max),
                },
                BinOp::Sub => Interval {
                    min: binop_ends(BinOp::Sub, &ia.min, &ib.max),
                    max: binop_ends(BinOp::Sub, &ia.max, &ib.min),
                },
                BinOp::Mul => {
                    // Only scaling by a known constant is tracked.
                    if let Some(c) = const_point(&ib) {
                        scale_interval(&ia, c, e.ty())
                    } else if let Some(c) = const_point(&ia) {
                        scale_interval(&ib, c, e.ty())
                    } else {
                        Interval::unbounded()
                    }
                }
                BinOp::Div => match const_point(&ib) {
                    Some(c) if c > 0 => {
                        let imm = Expr::int(c, e.ty().element_of());
                        Interval {
                            min: ia
                                .min
                                .map(|m| Expr::binary(BinOp::Div, m, imm.clone())),
                            max: ia.max.map(|m| Expr::binary(BinOp::Div, m, imm)),
                        }
                    }
                    _ => Interval::unbounded(),
                },
                BinOp::Mod => match const_point(&ib) {
                    Some(c) if c > 0 => {
                        let elem = e.ty().element_of();
                        Interval {
                            min: Some(Expr::int(0, elem)),
                            max: Some(Expr::int(c - 1, elem)),
                        }
                    }
                    _ => Interval::unbounded(),
                },
                // min(a, b) is clamped above by either known upper bound,
                // but below only when both lower bounds are known (an
                // unknown side can be arbitrarily small). Dually for max.
                BinOp::Min => Interval {
                    min: binop_ends(BinOp::Min, &ia.min, &ib.min),
                    max: either_min(&ia.max, &ib.max),
                },
                BinOp::Max => Interval {
                    min: either_max(&ia.min, &ib.min),
                    max: binop_ends(BinOp::Max, &ia.max, &ib.max),
                },
                _ => Interval::unbounded(),
            }
        }
        Expr::Not { .. } => {
            let bool_ty = Type::bool_type();
            Interval {
                min: Some(Expr::int(0, bool_ty)),
                max: Some(Expr::int(1, bool_ty)),
            }
        }
        Expr::Select {
            true_value,
            false_value,
            ..
        } => {
            let it = bounds_of_expr_in_scope(true_value, scope);
            let if_ = bounds_of_expr_in_scope(false_value, scope);
            // Either arm may be taken, so both bounds must be known.
            Interval {
                min: binop_ends(BinOp::Min, &it.min, &if_.min),
                max: binop_ends(BinOp::Max, &it.max, &if_.max),
            }
        }
        Expr::Let { name, value, body } => {
            let value_bounds = bounds_of_expr_in_scope(value, scope);
            scope.push(name.clone(), value_bounds);
            let out = bounds_of_expr_in_scope(body, scope);
            scope.pop(name);
            out
        }
        Expr::Load { .. } | Expr::Call { .. } => Interval::unbounded(),
        Expr::Broadcast { value, .. } => bounds_of_expr_in_scope(value, scope),
        Expr::Ramp {
            base,
            stride,
            lanes,
        } => {
            let ib = bounds_of_expr_in_scope(base, scope);
            match as_const_int(stride) {
                Some(c) => {
                    let extent = c * (*lanes as i64 - 1);
                    let imm = Expr::int(extent, base.ty().element_of());
                    if extent >= 0 {
                        Interval {
                            min: ib.min,
                            max: ib.max.map(|m| m + imm),
                        }
                    } else {
                        Interval {
                            min: ib.min.map(|m| m + imm),
                            max: ib.max,
                        }
                    }
                }
                None => Interval::unbounded(),
            }
        }
    }
}

fn const_point(i: &Interval) -> Option<i64> {
    match (&i.min, &i.max) {
        (Some(a), Some(b)) if a == b => as_const_int(a),
        _ => None,
    }
}

fn scale_interval(i: &Interval, c: i64, ty: Type) -> Interval {
    let imm = Expr::int(c, ty.element_of());
    let lo = i
        .min
        .clone()
        .map(|m| Expr::binary(BinOp::Mul, m, imm.clone()));
    let hi = i.max.clone().map(|m| Expr::binary(BinOp::Mul, m, imm));
    if c >= 0 {
        Interval { min: lo, max: hi }
    } else {
        Interval { min: hi, max: lo }
    }
}
