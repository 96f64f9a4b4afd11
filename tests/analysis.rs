//! The consumed analyses: simplifier, lossless casts, bounds inference,
//! common subexpression elimination, and substitution.

use laneopt::analysis::{
    bounds_of_expr_in_scope, common_subexpression_elimination, div_floor, lossless_cast,
    mod_floor, simplify, substitute, wrap_to_type, Interval,
};
use laneopt::ir::expr::{clamp, BinOp, Expr};
use laneopt::ir::scope::Scope;
use laneopt::Type;

fn i32s() -> Type {
    Type::int(32)
}

fn i32x8() -> Type {
    Type::int(32).with_lanes(8)
}

#[test]
fn floor_division() {
    assert_eq!(div_floor(7, 2), 3);
    assert_eq!(div_floor(-7, 2), -4);
    assert_eq!(div_floor(7, -2), -4);
    assert_eq!(mod_floor(-7, 2), 1);
    assert_eq!(mod_floor(7, -2), -1);
}

#[test]
fn wrapping() {
    assert_eq!(wrap_to_type(300, Type::uint(8)), 44);
    assert_eq!(wrap_to_type(-1, Type::uint(8)), 255);
    assert_eq!(wrap_to_type(128, Type::int(8)), -128);
    assert_eq!(wrap_to_type(65535, Type::int(16)), -1);
    assert_eq!(wrap_to_type(42, Type::int(64)), 42);
}

#[test]
fn simplify_folds_constants() {
    let e = (Expr::int(3, i32s()) + Expr::int(4, i32s())) * Expr::int(2, i32s());
    assert_eq!(simplify(&e), Expr::int(14, i32s()));
}

#[test]
fn simplify_identities() {
    let x = Expr::var("x", i32s());
    assert_eq!(simplify(&(x.clone() + Expr::int(0, i32s()))), x);
    assert_eq!(
        simplify(&(x.clone() - x.clone())),
        Expr::int(0, i32s())
    );
    assert_eq!(simplify(&(x.clone() * Expr::int(1, i32s()))), x);
    assert_eq!(
        simplify(&Expr::binary(BinOp::Min, x.clone(), x.clone())),
        x
    );
}

#[test]
fn simplify_reassociates_added_constants() {
    let x = Expr::var("x", i32s());
    let e = (x.clone() + Expr::int(5, i32s())) + Expr::int(7, i32s());
    assert_eq!(simplify(&e), x + Expr::int(12, i32s()));
}

#[test]
fn simplify_cancels_offset_pairs() {
    let x = Expr::var("x", i32s());
    let y = Expr::var("y", i32s());
    // (x + 9) - (y + 2) → (x - y) + 7
    let e = (x.clone() + Expr::int(9, i32s())) - (y.clone() + Expr::int(2, i32s()));
    assert_eq!(simplify(&e), x - y + Expr::int(7, i32s()));
}

#[test]
fn simplify_inlines_cheap_lets() {
    let e = Expr::let_in(
        "t",
        Expr::int(6, i32s()),
        Expr::var("t", i32s()) * Expr::var("t", i32s()),
    );
    assert_eq!(simplify(&e), Expr::int(36, i32s()));
}

#[test]
fn simplify_decides_comparisons_on_clamped_values() {
    let n = Expr::var("n", i32s());
    let clamped = Expr::binary(BinOp::Min, n.clone(), Expr::int(200, i32s()));
    let e = Expr::binary(BinOp::Lt, clamped, Expr::int(256, i32s()));
    assert_eq!(simplify(&e), Expr::int(1, Type::bool_type()));

    // A clamp that does not establish the bound is left alone.
    let too_wide = Expr::binary(BinOp::Min, n, Expr::int(300, i32s()));
    let e = Expr::binary(BinOp::Lt, too_wide, Expr::int(256, i32s()));
    assert_eq!(simplify(&e), e);
}

#[test]
fn let_inlining_avoids_name_capture() {
    let ty = i32s();
    let a = Expr::var("a", ty);
    let b = Expr::var("b", ty);
    let y = Expr::var("y", ty);
    // Inlining x = y under the inner rebinding of y would change which
    // y the body reads.
    let inner = Expr::let_in(
        "y",
        a * b,
        y.clone() + y.clone() + Expr::var("x", ty),
    );
    let e = Expr::let_in("x", y, inner);
    assert_eq!(simplify(&e), e);
}

#[test]
fn simplify_keeps_expensive_multi_use_lets() {
    let x = Expr::var("x", i32s());
    let value = x.clone() * x;
    let t = Expr::var("t", i32s());
    let e = Expr::let_in("t", value.clone(), t.clone() + t.clone());
    assert_eq!(e, simplify(&e));
}

#[test]
fn lossless_cast_strips_widening() {
    let a = Expr::var("a", Type::uint(8).with_lanes(8));
    let widened = Expr::cast(Type::uint(16).with_lanes(8), a.clone());
    assert_eq!(
        lossless_cast(Type::uint(8).with_lanes(8), &widened),
        Some(a)
    );
}

#[test]
fn lossless_cast_widens_freely() {
    let a = Expr::var("a", Type::uint(8).with_lanes(8));
    assert_eq!(
        lossless_cast(Type::int(16).with_lanes(8), &a),
        Some(Expr::cast(Type::int(16).with_lanes(8), a.clone()))
    );
}

#[test]
fn lossless_cast_refuses_unprovable_narrowing() {
    let a = Expr::var("a", Type::uint(16).with_lanes(8));
    assert_eq!(lossless_cast(Type::uint(8).with_lanes(8), &a), None);
}

#[test]
fn lossless_cast_through_broadcast_and_imm() {
    let b = Expr::broadcast(Expr::int(100, Type::int(16)), 8);
    assert_eq!(
        lossless_cast(Type::int(8).with_lanes(8), &b),
        Some(Expr::broadcast(Expr::int(100, Type::int(8)), 8))
    );
    assert_eq!(
        lossless_cast(
            Type::int(8).with_lanes(8),
            &Expr::broadcast(Expr::int(200, Type::int(16)), 8)
        ),
        None
    );
}

#[test]
fn bounds_of_clamped_value() {
    let x = Expr::var("x", i32x8());
    let e = clamp(x, Expr::int(10, i32s()), Expr::int(40, i32s()));
    let interval = bounds_of_expr_in_scope(&e, &mut Scope::new());
    assert_eq!(interval.min.map(|m| simplify(&m)), Some(Expr::int(10, i32s())));
    assert_eq!(interval.max.map(|m| simplify(&m)), Some(Expr::int(40, i32s())));
}

#[test]
fn bounds_of_one_sided_clamp_stay_one_sided() {
    // max(x, 10) is bounded below but not above.
    let x = Expr::var("x", i32x8());
    let e = Expr::binary(BinOp::Max, x, Expr::int(10, i32s()));
    let interval = bounds_of_expr_in_scope(&e, &mut Scope::new());
    assert!(interval.min.is_some());
    assert!(interval.max.is_none());
}

#[test]
fn bounds_fall_back_to_narrow_type_range() {
    let v = Expr::var("v", Type::uint(8).with_lanes(8));
    let interval = bounds_of_expr_in_scope(&v, &mut Scope::new());
    assert_eq!(interval.min, Some(Expr::int(0, Type::uint(8))));
    assert_eq!(interval.max, Some(Expr::int(255, Type::uint(8))));

    let wide = Expr::var("w", i32x8());
    let interval = bounds_of_expr_in_scope(&wide, &mut Scope::new());
    assert!(!interval.is_bounded());
}

#[test]
fn scalar_variables_bound_themselves() {
    // One value per evaluation, so a free scalar is its own bound; a
    // broadcast of it inherits the same point interval.
    let n = Expr::var("n", i32s());
    let interval = bounds_of_expr_in_scope(&n, &mut Scope::new());
    assert_eq!(interval, Interval::point(n.clone()));

    let b = Expr::broadcast(n.clone(), 8);
    let interval = bounds_of_expr_in_scope(&b, &mut Scope::new());
    assert_eq!(interval, Interval::point(n));
}

#[test]
fn bounds_of_ramp_and_mod() {
    let r = Expr::ramp(Expr::int(5, i32s()), Expr::int(2, i32s()), 8);
    let interval = bounds_of_expr_in_scope(&r, &mut Scope::new());
    assert_eq!(interval.min.map(|m| simplify(&m)), Some(Expr::int(5, i32s())));
    assert_eq!(interval.max.map(|m| simplify(&m)), Some(Expr::int(19, i32s())));

    let x = Expr::var("x", i32x8());
    let m = x % Expr::int(8, i32s());
    let interval = bounds_of_expr_in_scope(&m, &mut Scope::new());
    assert_eq!(interval.min, Some(Expr::int(0, i32s())));
    assert_eq!(interval.max, Some(Expr::int(7, i32s())));
}

#[test]
fn bounds_follow_let_bindings() {
    let x = Expr::var("x", i32x8());
    let e = Expr::let_in(
        "t",
        x % Expr::int(8, i32s()),
        Expr::var("t", i32x8()) + Expr::int(1, i32s()),
    );
    let interval = bounds_of_expr_in_scope(&e, &mut Scope::new());
    assert_eq!(interval.min.map(|m| simplify(&m)), Some(Expr::int(1, i32s())));
    assert_eq!(interval.max.map(|m| simplify(&m)), Some(Expr::int(8, i32s())));
}

#[test]
fn cse_hoists_repeated_subtrees() {
    let a = Expr::var("a", i32s());
    let b = Expr::var("b", i32s());
    let prod = a * b;
    let e = prod.clone() + prod.clone();

    let t0 = Expr::var("t0", i32s());
    let expected = Expr::let_in("t0", prod, t0.clone() + t0);
    assert_eq!(common_subexpression_elimination(&e), expected);
}

#[test]
fn cse_leaves_single_occurrences_alone() {
    let a = Expr::var("a", i32s());
    let b = Expr::var("b", i32s());
    let e = a.clone() * b.clone() + a - b;
    assert_eq!(common_subexpression_elimination(&e), e);
}

#[test]
fn substitute_respects_shadowing() {
    let ty = i32s();
    let replacement = Expr::int(7, ty);
    let e = Expr::var("x", ty) + Expr::let_in("x", Expr::int(1, ty), Expr::var("x", ty));
    let out = substitute("x", &replacement, &e);
    // The free occurrence is replaced; the shadowed body occurrence is not.
    let expected =
        replacement + Expr::let_in("x", Expr::int(1, ty), Expr::var("x", ty));
    assert_eq!(out, expected);
}
