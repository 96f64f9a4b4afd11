//! The consumed algebraic simplifier.
//!
//! Deliberately small: constant folding, neutral-element and
//! self-cancellation identities, and let inlining. Just enough strength
//! for the shuffle optimizer to reduce index-span expressions to
//! compile-time constants and for negation rewrites to fold. General
//! algebraic simplification is out of scope.

use crate::analysis::substitute::substitute;
use crate::ir::expr::{as_const_int, expr_uses_var, BinOp, Expr};
use crate::ir::types::{Type, TypeCode};

/// Integer division rounding toward negative infinity. The IR's `Div`.
pub fn div_floor(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// Modulo paired with [`div_floor`]: the result has the divisor's sign.
pub fn mod_floor(a: i64, b: i64) -> i64 {
    a.wrapping_sub(div_floor(a, b).wrapping_mul(b))
}

/// Wraps `v` into the value range of `ty`'s element.
pub fn wrap_to_type(v: i64, ty: Type) -> i64 {
    let bits = ty.bits;
    if bits >= 64 {
        return v;
    }
    let masked = v & ((1i64 << bits) - 1);
    match ty.code {
        TypeCode::UInt => masked,
        TypeCode::Int => {
            // Sign-extend the low `bits` bits.
            let sign = 1i64 << (bits - 1);
            (masked ^ sign) - sign
        }
        TypeCode::Float => v,
    }
}

/// Simplifies `e`. Pure and deterministic; never changes the value of
/// the expression for any valuation of its free variables.
pub fn simplify(e: &Expr) -> Expr {
    let out = simplify_node(e);
    if &out != e {
        // A rewrite may expose further folding opportunities; rules are
        // strictly size-reducing, so this terminates.
        simplify(&out)
    } else {
        out
    }
}

fn simplify_node(e: &Expr) -> Expr {
    match e {
        Expr::IntImm { .. } | Expr::Var { .. } => e.clone(),
        Expr::Cast { ty, value } => {
            let value = simplify(value);
            if value.ty() == *ty {
                return value;
            }
            if let Expr::IntImm { value: v, .. } = value {
                if ty.is_scalar() && ty.can_hold(v) {
                    return Expr::int(v, *ty);
                }
            }
            Expr::cast(*ty, value)
        }
        Expr::Binary { op, a, b } => {
            let a = simplify(a);
            let b = simplify(b);
            simplify_binary(*op, a, b)
        }
        Expr::Not { a } => {
            let a = simplify(a);
            match as_const_int(&a) {
                Some(v) if a.ty().is_scalar() => Expr::int((v == 0) as i64, a.ty()),
                _ => Expr::not(a),
            }
        }
        Expr::Select {
            cond,
            true_value,
            false_value,
        } => {
            let cond = simplify(cond);
            let t = simplify(true_value);
            let f = simplify(false_value);
            match as_const_int(&cond) {
                Some(0) => f,
                Some(_) => t,
                None => Expr::select(cond, t, f),
            }
        }
        Expr::Let { name, value, body } => {
            let value = simplify(value);
            let body = simplify(body);
            simplify_let(name, value, body)
        }
        Expr::Load { ty, name, index } => Expr::load(*ty, name.clone(), simplify(index)),
        Expr::Broadcast { value, lanes } => Expr::broadcast(simplify(value), *lanes),
        Expr::Ramp {
            base,
            stride,
            lanes,
        } => Expr::ramp(simplify(base), simplify(stride), *lanes),
        Expr::Call {
            ty,
            name,
            class,
            args,
        } => Expr::call(
            *ty,
            name.clone(),
            *class,
            args.iter().map(simplify).collect(),
        ),
    }
}

fn simplify_binary(op: BinOp, a: Expr, b: Expr) -> Expr {
    // Scalar constant folding.
    if let (Expr::IntImm { value: va, ty }, Expr::IntImm { value: vb, .. }) = (&a, &b) {
        if let Some(v) = fold_binary(op, *va, *vb, *ty) {
            let out_ty = if op.is_boolean() {
                Type::bool_type()
            } else {
                *ty
            };
            return Expr::int(v, out_ty);
        }
    }

    match op {
        BinOp::Add => {
            if is_const_zero(&b) {
                return a;
            }
            if is_const_zero(&a) {
                return b;
            }
            // (x + c1) + c2 → x + (c1 + c2)
            if let (Expr::Binary { op: BinOp::Add, a: x, b: c1 }, Expr::IntImm { value: v2, ty }) =
                (&a, &b)
            {
                if let Expr::IntImm { value: v1, .. } = c1.as_ref() {
                    let c = wrap_to_type(v1.wrapping_add(*v2), *ty);
                    return simplify(&(x.as_ref().clone() + Expr::int(c, *ty)));
                }
            }
        }
        BinOp::Sub => {
            if is_const_zero(&b) {
                return a;
            }
            if a == b {
                return Expr::int(0, a.ty().element_of());
            }
            // (x + c) - x → c
            if let Expr::Binary {
                op: BinOp::Add,
                a: x,
                b: c,
            } = &a
            {
                if x.as_ref() == &b {
                    return c.as_ref().clone();
                }
                if c.as_ref() == &b {
                    return x.as_ref().clone();
                }
                // (x + c1) - (y + c2) → (x - y) + (c1 - c2)
                if let Expr::Binary {
                    op: BinOp::Add,
                    a: y,
                    b: d,
                } = &b
                {
                    if let (Expr::IntImm { value: v1, ty }, Expr::IntImm { value: v2, .. }) =
                        (c.as_ref(), d.as_ref())
                    {
                        let k = wrap_to_type(v1.wrapping_sub(*v2), *ty);
                        return simplify(
                            &(x.as_ref().clone() - y.as_ref().clone() + Expr::int(k, *ty)),
                        );
                    }
                }
            }
        }
        BinOp::Mul => {
            if is_const_one(&b) {
                return a;
            }
            if is_const_one(&a) {
                return b;
            }
            if is_const_zero(&a) || is_const_zero(&b) {
                return Expr::int(0, a.ty().element_of());
            }
        }
        BinOp::Div => {
            if is_const_one(&b) {
                return a;
            }
        }
        BinOp::Min | BinOp::Max => {
            if a == b {
                return a;
            }
        }
        BinOp::Lt => {
            // Clamped index spans compare against the shuffle table limit
            // without ever folding to a constant; the min/max structure
            // alone can decide the comparison.
            if let Expr::IntImm { value: limit, .. } = &b {
                if a.ty().is_scalar() && known_below(&a, *limit) {
                    return Expr::int(1, Type::bool_type());
                }
            }
        }
        _ => {}
    }
    Expr::binary(op, a, b)
}

fn fold_binary(op: BinOp, a: i64, b: i64, ty: Type) -> Option<i64> {
    let v = match op {
        BinOp::Add => wrap_to_type(a.wrapping_add(b), ty),
        BinOp::Sub => wrap_to_type(a.wrapping_sub(b), ty),
        BinOp::Mul => wrap_to_type(a.wrapping_mul(b), ty),
        BinOp::Div => {
            if b == 0 {
                return None;
            }
            wrap_to_type(div_floor(a, b), ty)
        }
        BinOp::Mod => {
            if b == 0 {
                return None;
            }
            wrap_to_type(mod_floor(a, b), ty)
        }
        BinOp::Min => a.min(b),
        BinOp::Max => a.max(b),
        BinOp::Eq => (a == b) as i64,
        BinOp::Ne => (a != b) as i64,
        BinOp::Lt => (a < b) as i64,
        BinOp::Le => (a <= b) as i64,
        BinOp::Gt => (a > b) as i64,
        BinOp::Ge => (a >= b) as i64,
        BinOp::And => ((a != 0) && (b != 0)) as i64,
        BinOp::Or => ((a != 0) || (b != 0)) as i64,
    };
    Some(v)
}

/// Structural proof that `e < limit` for every valuation: a constant
/// below the limit, a `min` with one such operand, or a `max` of two.
fn known_below(e: &Expr, limit: i64) -> bool {
    match e {
        Expr::IntImm { value, .. } => *value < limit,
        Expr::Binary {
            op: BinOp::Min,
            a,
            b,
        } => known_below(a, limit) || known_below(b, limit),
        Expr::Binary {
            op: BinOp::Max,
            a,
            b,
        } => known_below(a, limit) && known_below(b, limit),
        _ => false,
    }
}

fn is_const_zero(e: &Expr) -> bool {
    matches!(e, Expr::IntImm { value: 0, .. })
}

fn is_const_one(e: &Expr) -> bool {
    matches!(e, Expr::IntImm { value: 1, .. })
}

fn simplify_let(name: &str, value: Expr, body: Expr) -> Expr {
    // Cheap values and single-use bindings are inlined; everything else
    // keeps its let.
    let uses = count_uses(&body, name);
    if uses == 0 {
        return body;
    }
    let cheap = matches!(value, Expr::IntImm { .. } | Expr::Var { .. });
    if (cheap || uses == 1) && !rebinds_free_name(&body, &value) {
        return simplify(&substitute(name, &value, &body));
    }
    Expr::let_in(name, value, body)
}

/// True if `body` contains a let rebinding a name that `value` reads.
/// Substituting `value` under such a let would capture that name.
fn rebinds_free_name(body: &Expr, value: &Expr) -> bool {
    match body {
        Expr::IntImm { .. } | Expr::Var { .. } => false,
        Expr::Cast { value: v, .. } | Expr::Broadcast { value: v, .. } => {
            rebinds_free_name(v, value)
        }
        Expr::Not { a } => rebinds_free_name(a, value),
        Expr::Binary { a, b, .. } => {
            rebinds_free_name(a, value) || rebinds_free_name(b, value)
        }
        Expr::Select {
            cond,
            true_value,
            false_value,
        } => {
            rebinds_free_name(cond, value)
                || rebinds_free_name(true_value, value)
                || rebinds_free_name(false_value, value)
        }
        Expr::Let {
            name,
            value: bound,
            body: inner,
        } => {
            expr_uses_var(value, name)
                || rebinds_free_name(bound, value)
                || rebinds_free_name(inner, value)
        }
        Expr::Load { index, .. } => rebinds_free_name(index, value),
        Expr::Ramp { base, stride, .. } => {
            rebinds_free_name(base, value) || rebinds_free_name(stride, value)
        }
        Expr::Call { args, .. } => args.iter().any(|a| rebinds_free_name(a, value)),
    }
}

fn count_uses(e: &Expr, name: &str) -> usize {
    match e {
        Expr::IntImm { .. } => 0,
        Expr::Var { name: n, .. } => (n == name) as usize,
        Expr::Cast { value, .. } => count_uses(value, name),
        Expr::Binary { a, b, .. } => count_uses(a, name) + count_uses(b, name),
        Expr::Not { a } => count_uses(a, name),
        Expr::Select {
            cond,
            true_value,
            false_value,
        } => count_uses(cond, name) + count_uses(true_value, name) + count_uses(false_value, name),
        Expr::Let {
            name: bound,
            value,
            body,
        } => {
            count_uses(value, name)
                + if bound == name {
                    0
                } else {
                    count_uses(body, name)
                }
        }
        Expr::Load { index, .. } => count_uses(index, name),
        Expr::Broadcast { value, .. } => count_uses(value, name),
        Expr::Ramp { base, stride, .. } => count_uses(base, name) + count_uses(stride, name),
        Expr::Call { args, .. } => args.iter().map(|a| count_uses(a, name)).sum(),
    }
}
