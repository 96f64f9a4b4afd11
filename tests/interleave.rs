//! Marker cancellation: pair elimination, pointwise motion, let
//! rebinding, and the pack/trunc dual substitution.

use laneopt::ir::expr::{CallClass, Expr, Stmt};
use laneopt::pass::{EliminateInterleaves, Pass};
use laneopt::target::{native_deinterleave, native_interleave, vpu_op};
use laneopt::Type;

const LANES: u32 = 8;

fn u8x() -> Type {
    Type::uint(8).with_lanes(LANES)
}

fn i16x() -> Type {
    Type::int(16).with_lanes(LANES)
}

fn eliminate(s: &Stmt) -> Stmt {
    EliminateInterleaves::new().run(s)
}

fn eliminate_expr(e: Expr) -> Expr {
    match eliminate(&Stmt::Evaluate(e)) {
        Stmt::Evaluate(out) => out,
        other => panic!("unexpected statement {}", other),
    }
}

#[test]
fn deinterleave_of_interleave_cancels() {
    let x = Expr::var("x", u8x());
    let e = native_deinterleave(native_interleave(x.clone()));
    assert_eq!(eliminate_expr(e), x);
}

#[test]
fn lone_markers_survive() {
    let x = Expr::var("x", u8x());
    let e = native_interleave(x.clone());
    assert_eq!(eliminate_expr(e.clone()), e);
    let e = native_deinterleave(x);
    assert_eq!(eliminate_expr(e.clone()), e);
}

#[test]
fn markers_move_through_pointwise_arithmetic() {
    let a = Expr::var("a", i16x());
    let b = Expr::var("b", i16x());
    let e = native_interleave(a.clone()) + native_interleave(b.clone());
    assert_eq!(eliminate_expr(e), native_interleave(a + b));
}

#[test]
fn broadcasts_count_as_interleaves() {
    let a = Expr::var("a", i16x());
    let five = Expr::broadcast(Expr::int(5, Type::int(16)), LANES);
    let e = native_interleave(a.clone()) + five.clone();
    assert_eq!(eliminate_expr(e), native_interleave(a + five));
}

#[test]
fn no_motion_without_a_literal_marker() {
    // Two broadcasts are layout-invariant but stripping them removes no
    // marker, so the add is left alone.
    let five = Expr::broadcast(Expr::int(5, Type::int(16)), LANES);
    let e = five.clone() + five;
    assert_eq!(eliminate_expr(e.clone()), e);
}

#[test]
fn markers_move_through_select_and_casts() {
    let c = Expr::var("c", Type::bool_type());
    let a = Expr::var("a", i16x());
    let b = Expr::var("b", i16x());
    let e = Expr::select(
        c.clone(),
        native_interleave(a.clone()),
        native_interleave(b.clone()),
    );
    assert_eq!(
        eliminate_expr(e),
        native_interleave(Expr::select(c, a, b))
    );

    let w = Expr::var("w", i16x());
    let reinterpret = Expr::cast(Type::uint(16).with_lanes(LANES), native_interleave(w.clone()));
    assert_eq!(
        eliminate_expr(reinterpret),
        native_interleave(Expr::cast(Type::uint(16).with_lanes(LANES), w))
    );
}

#[test]
fn transparent_intrinsic_passes_markers_to_its_result() {
    let a = Expr::var("a", u8x());
    let b = Expr::var("b", u8x());
    let e = vpu_op(
        u8x(),
        "vpu.avg.vub.vub",
        vec![native_interleave(a.clone()), native_interleave(b.clone())],
    );
    assert_eq!(
        eliminate_expr(e),
        native_interleave(vpu_op(u8x(), "vpu.avg.vub.vub", vec![a, b]))
    );
}

#[test]
fn shape_changing_intrinsic_blocks_markers() {
    let a = Expr::var("a", u8x());
    let e = vpu_op(
        Type::uint(16).with_lanes(LANES),
        "vpu.zxt.vub",
        vec![native_interleave(a)],
    );
    assert_eq!(eliminate_expr(e.clone()), e);
}

#[test]
fn pack_of_interleave_uses_the_trunc_dual() {
    let w = Expr::var("w", i16x());
    let e = vpu_op(u8x(), "vpu.pack_satub.vh", vec![native_interleave(w.clone())]);
    assert_eq!(
        eliminate_expr(e),
        Expr::call(u8x(), "vpu.trunc_satub.vh", CallClass::Extern, vec![w])
    );
}

#[test]
fn pack_dual_appends_required_shift_argument() {
    let w = Expr::var("w", Type::int(32).with_lanes(LANES));
    let ty = Type::uint(16).with_lanes(LANES);
    let e = vpu_op(ty, "vpu.pack_satuh.vw", vec![native_interleave(w.clone())]);
    assert_eq!(
        eliminate_expr(e),
        Expr::call(
            ty,
            "vpu.trunc_satuh_shr.vw.w",
            CallClass::Extern,
            vec![w, Expr::int(0, Type::int(32))]
        )
    );
}

#[test]
fn pack_of_plain_value_stays_a_pack() {
    let w = Expr::var("w", i16x());
    let e = vpu_op(u8x(), "vpu.pack_satub.vh", vec![w]);
    assert_eq!(eliminate_expr(e.clone()), e);
}

#[test]
fn let_rebinds_to_the_deinterleaved_shadow() {
    let a = Expr::var("a", i16x());
    let ty = i16x();
    let s = Stmt::let_stmt(
        "x",
        native_interleave(a.clone()),
        Stmt::Evaluate(native_deinterleave(Expr::var("x", ty))),
    );
    let expected = Stmt::let_stmt(
        "x.deinterleaved",
        a,
        Stmt::Evaluate(Expr::var("x.deinterleaved", ty)),
    );
    assert_eq!(eliminate(&s), expected);
}

#[test]
fn let_used_in_both_layouts_binds_each_once() {
    let a = Expr::var("a", i16x());
    let ty = i16x();
    let body = Stmt::Evaluate(
        native_deinterleave(Expr::var("x", ty)) + Expr::var("x", ty),
    );
    let s = Stmt::let_stmt("x", native_interleave(a.clone()), body);

    let shadow = Expr::var("x.deinterleaved", ty);
    let expected = Stmt::let_stmt(
        "x.deinterleaved",
        a,
        Stmt::let_stmt(
            "x",
            native_interleave(shadow.clone()),
            Stmt::Evaluate(shadow + Expr::var("x", ty)),
        ),
    );
    assert_eq!(eliminate(&s), expected);
}

#[test]
fn let_used_only_in_original_layout_is_unchanged() {
    let a = Expr::var("a", i16x());
    let ty = i16x();
    let s = Stmt::let_stmt(
        "x",
        native_interleave(a),
        Stmt::Evaluate(Expr::var("x", ty) * Expr::var("x", ty)),
    );
    assert_eq!(eliminate(&s), s);
}

#[test]
fn expression_lets_are_rebound_too() {
    let a = Expr::var("a", i16x());
    let ty = i16x();
    let e = Expr::let_in(
        "x",
        native_interleave(a.clone()),
        native_deinterleave(Expr::var("x", ty)),
    );
    let expected = Expr::let_in("x.deinterleaved", a, Expr::var("x.deinterleaved", ty));
    assert_eq!(eliminate_expr(e), expected);
}

#[test]
fn elimination_is_idempotent() {
    let a = Expr::var("a", i16x());
    let b = Expr::var("b", i16x());
    let e = native_deinterleave(
        native_interleave(a.clone()) + native_interleave(b.clone()),
    );
    let once = eliminate(&Stmt::Evaluate(e));
    let twice = eliminate(&once);
    assert_eq!(once, twice);
    assert_eq!(once, Stmt::Evaluate(a + b));
}
