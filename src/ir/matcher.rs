//! Structural wildcard matching of pattern templates against candidate
//! expressions.
//!
//! A wildcard is a variable named `*`. Its type constrains the match: the
//! element code and bit width must agree exactly, while a template lane
//! count of 0 matches any vector lane count — and all lane-count
//! wildcards in one template must unify to the same count. Successful
//! matches bind wildcards positionally, in template traversal order.

use smallvec::SmallVec;

use crate::ir::expr::Expr;
use crate::ir::types::Type;

/// Positional wildcard bindings of one successful match.
pub type MatchBindings = SmallVec<[Expr; 4]>;

/// The wildcard variable name.
pub const WILDCARD: &str = "*";

/// Matches `template` against `e`. On success, `bindings` holds the
/// captured sub-expressions in template traversal order. On failure,
/// `bindings` contents are unspecified.
pub fn expr_match(template: &Expr, e: &Expr, bindings: &mut MatchBindings) -> bool {
    bindings.clear();
    let mut lanes = 0u32;
    do_match(template, e, bindings, &mut lanes)
}

/// Checks element code and bits exactly; lane count 0 in the template is
/// a vector wildcard unified through `unifier` (0 = not yet bound).
fn types_match(template: Type, actual: Type, unifier: &mut u32) -> bool {
    if template.code != actual.code || template.bits != actual.bits {
        return false;
    }
    if template.lanes != 0 {
        return template.lanes == actual.lanes;
    }
    unify_lanes(actual.lanes, unifier)
}

fn unify_lanes(actual: u32, unifier: &mut u32) -> bool {
    if actual <= 1 {
        // A lane wildcard stands for a vector.
        return false;
    }
    if *unifier == 0 {
        *unifier = actual;
        true
    } else {
        *unifier == actual
    }
}

fn do_match(template: &Expr, e: &Expr, bindings: &mut MatchBindings, lanes: &mut u32) -> bool {
    match template {
        Expr::Var { name, ty } if name == WILDCARD => {
            if types_match(*ty, e.ty(), lanes) {
                bindings.push(e.clone());
                true
            } else {
                false
            }
        }
        Expr::Var { name, ty } => {
            matches!(e, Expr::Var { name: n, ty: t } if n == name && types_match(*ty, *t, lanes))
        }
        Expr::IntImm { value, ty } => {
            matches!(e, Expr::IntImm { value: v, ty: t } if v == value && types_match(*ty, *t, lanes))
        }
        Expr::Cast { ty, value } => match e {
            Expr::Cast { ty: t, value: v } => {
                types_match(*ty, *t, lanes) && do_match(value, v, bindings, lanes)
            }
            _ => false,
        },
        Expr::Binary { op, a, b } => match e {
            Expr::Binary { op: o, a: ea, b: eb } => {
                op == o && do_match(a, ea, bindings, lanes) && do_match(b, eb, bindings, lanes)
            }
            _ => false,
        },
        Expr::Not { a } => match e {
            Expr::Not { a: ea } => do_match(a, ea, bindings, lanes),
            _ => false,
        },
        Expr::Select {
            cond,
            true_value,
            false_value,
        } => match e {
            Expr::Select {
                cond: ec,
                true_value: et,
                false_value: ef,
            } => {
                do_match(cond, ec, bindings, lanes)
                    && do_match(true_value, et, bindings, lanes)
                    && do_match(false_value, ef, bindings, lanes)
            }
            _ => false,
        },
        Expr::Broadcast { value, lanes: bl } => match e {
            Expr::Broadcast {
                value: ev,
                lanes: el,
            } => {
                let lanes_ok = if *bl != 0 {
                    bl == el
                } else {
                    unify_lanes(*el, lanes)
                };
                lanes_ok && do_match(value, ev, bindings, lanes)
            }
            _ => false,
        },
        Expr::Ramp {
            base,
            stride,
            lanes: rl,
        } => match e {
            Expr::Ramp {
                base: eb,
                stride: es,
                lanes: el,
            } => {
                let lanes_ok = if *rl != 0 {
                    rl == el
                } else {
                    unify_lanes(*el, lanes)
                };
                lanes_ok
                    && do_match(base, eb, bindings, lanes)
                    && do_match(stride, es, bindings, lanes)
            }
            _ => false,
        },
        Expr::Call {
            ty,
            name,
            class,
            args,
        } => match e {
            Expr::Call {
                ty: et,
                name: en,
                class: ec,
                args: ea,
            } => {
                name == en
                    && class == ec
                    && args.len() == ea.len()
                    && types_match(*ty, *et, lanes)
                    && args
                        .iter()
                        .zip(ea.iter())
                        .all(|(t, e)| do_match(t, e, bindings, lanes))
            }
            _ => false,
        },
        // Templates never contain lets or loads.
        Expr::Let { .. } | Expr::Load { .. } => false,
    }
}
