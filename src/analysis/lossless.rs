//! Provably-lossless cast queries.

use crate::ir::expr::Expr;
use crate::ir::types::Type;

/// Returns an expression of type `t` provably equal in value to `e` for
/// every valuation, or `None` when no such cast can be proven. This is
/// the gate on every narrowing rewrite: failure here must fall back to
/// the next pattern, never fabricate a value.
pub fn lossless_cast(t: Type, e: &Expr) -> Option<Expr> {
    if e.ty() == t {
        return Some(e.clone());
    }
    if t.lanes != e.ty().lanes {
        return None;
    }
    if t.can_represent(e.ty()) {
        return Some(Expr::cast(t, e.clone()));
    }
    match e {
        Expr::Cast { value, .. } => {
            // A narrowing of a widening cast is lossless when the target
            // can hold the pre-widening type.
            if t.can_represent(value.ty()) {
                lossless_cast(t.with_lanes(value.ty().lanes), value)
            } else {
                None
            }
        }
        Expr::Broadcast { value, lanes } => {
            lossless_cast(t.element_of(), value).map(|v| Expr::broadcast(v, *lanes))
        }
        Expr::IntImm { value, .. } => {
            if t.is_scalar() && t.can_hold(*value) {
                Some(Expr::int(*value, t))
            } else {
                None
            }
        }
        _ => None,
    }
}
