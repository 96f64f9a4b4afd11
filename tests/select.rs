//! Instruction selection: table hits, commuted retries, operand
//! coercions, and the fallbacks when a proof obligation fails.

use laneopt::ir::expr::{
    bitwise_not, clamp, count_leading_zeros, max, min, shift_left, BinOp, Expr, Stmt,
};
use laneopt::pass::{Pass, SelectInstructions};
use laneopt::target::{native_deinterleave, native_interleave, vpu_op};
use laneopt::Type;

const LANES: u32 = 8;

fn u8x() -> Type {
    Type::uint(8).with_lanes(LANES)
}

fn u16x() -> Type {
    Type::uint(16).with_lanes(LANES)
}

fn i16x() -> Type {
    Type::int(16).with_lanes(LANES)
}

fn i32x() -> Type {
    Type::int(32).with_lanes(LANES)
}

fn select(e: Expr) -> Expr {
    let mut pass = SelectInstructions;
    match pass.run(&Stmt::Evaluate(e)) {
        Stmt::Evaluate(out) => out,
        other => panic!("unexpected statement {}", other),
    }
}

#[test]
fn widening_average_selects_avg() {
    let a = Expr::var("a", u8x());
    let b = Expr::var("b", u8x());
    let wide = |e: Expr| Expr::cast(u16x(), e);
    let e = Expr::cast(u8x(), (wide(a.clone()) + wide(b.clone())) / 2);

    let expected = vpu_op(u8x(), "vpu.avg.vub.vub", vec![a, b]);
    assert_eq!(select(e), expected);
}

#[test]
fn shift_accumulate_matches_commuted() {
    let acc = Expr::var("acc", i32x());
    let x = Expr::var("x", i32x());
    // The shifted term written on the left only matches after the
    // commuted retry.
    let e = shift_left(x.clone(), Expr::int(5, Type::int(32))) + acc.clone();

    let expected = vpu_op(
        i32x(),
        "vpu.add_shl.vw.vw.w",
        vec![acc, x, Expr::int(5, Type::int(32))],
    );
    assert_eq!(select(e), expected);
}

#[test]
fn subtract_of_negatable_product_becomes_multiply_add() {
    let a = Expr::var("a", i16x());
    let b = Expr::var("b", i16x());
    let e = a.clone() - b.clone() * Expr::int(3, Type::int(16));

    let expected = vpu_op(
        i16x(),
        "vpu.add_mul.vh.vh.b",
        vec![a, b, Expr::int(-3, Type::int(8))],
    );
    assert_eq!(select(e), expected);
}

#[test]
fn subtract_without_negation_proof_is_untouched() {
    let a = Expr::var("a", i16x());
    let b = Expr::var("b", i16x());
    let c = Expr::var("c", i16x());
    let e = a - b * c;
    assert_eq!(select(e.clone()), e);
}

#[test]
fn leading_sign_count_plus_one() {
    let x = Expr::var("x", i16x());
    let e = max(
        count_leading_zeros(x.clone()),
        count_leading_zeros(bitwise_not(x.clone())),
    );
    let expected = vpu_op(i16x(), "vpu.cls.vh", vec![x]) + 1;
    assert_eq!(select(e), expected);
}

#[test]
fn leading_zero_max_over_distinct_values_is_untouched() {
    let x = Expr::var("x", i16x());
    let y = Expr::var("y", i16x());
    let e = max(
        count_leading_zeros(x),
        count_leading_zeros(bitwise_not(y)),
    );
    assert_eq!(select(e.clone()), e);
}

#[test]
fn power_of_two_divide_becomes_saturating_shift() {
    let x = Expr::var("x", i32x());
    let e = Expr::cast(
        i16x(),
        clamp(
            x.clone() / 64,
            Expr::int(-32768, Type::int(32)),
            Expr::int(32767, Type::int(32)),
        ),
    );
    let expected = vpu_op(
        i16x(),
        "vpu.trunc_sath_shr.vw.w",
        vec![native_deinterleave(x), Expr::int(6, Type::int(32))],
    );
    assert_eq!(select(e), expected);
}

#[test]
fn non_power_of_two_divide_keeps_the_division() {
    let x = Expr::var("x", i32x());
    let quotient = x / 48;
    let e = Expr::cast(
        i16x(),
        clamp(
            quotient.clone(),
            Expr::int(-32768, Type::int(32)),
            Expr::int(32767, Type::int(32)),
        ),
    );
    // The shift pattern's power-of-two obligation fails and the match
    // falls through to the plain saturating narrow.
    let expected = vpu_op(i16x(), "vpu.pack_sath.vw", vec![quotient]);
    assert_eq!(select(e), expected);
}

#[test]
fn rounded_saturating_narrow() {
    let w = Expr::var("w", i16x());
    let widened = Expr::cast(i32x(), w.clone());
    let e = Expr::cast(
        u8x(),
        clamp(
            (widened + 128) / 256,
            Expr::int(0, Type::int(32)),
            Expr::int(255, Type::int(32)),
        ),
    );
    let expected = vpu_op(
        u8x(),
        "vpu.trunc_satub_rnd.vh",
        vec![native_deinterleave(w)],
    );
    assert_eq!(select(e), expected);
}

#[test]
fn unprovable_narrowing_falls_back_to_pack() {
    let a = Expr::var("a", u16x());
    let b = Expr::var("b", u16x());
    // The operands are full-width u16 values, so the saturating-add
    // pattern cannot prove its narrowing and the clamp survives inside a
    // plain pack.
    let clamped = min(a.clone() + b.clone(), Expr::int(255, Type::uint(16)));
    let e = Expr::cast(u8x(), clamped.clone());

    let expected = vpu_op(u8x(), "vpu.pack.vh", vec![clamped]);
    assert_eq!(select(e), expected);
}

#[test]
fn widening_multiply_by_scalar() {
    let a = Expr::var("a", u8x());
    let s = Expr::var("s", Type::uint(8));
    let e = Expr::cast(u16x(), a.clone())
        * Expr::broadcast(Expr::cast(Type::uint(16), s.clone()), LANES);

    let expected = native_interleave(vpu_op(u16x(), "vpu.mpy.vub.ub", vec![a, s]));
    assert_eq!(select(e), expected);
}

#[test]
fn quadrupling_cast_is_staged_through_the_half_width_type() {
    let a = Expr::var("a", u8x());
    let e = Expr::cast(i32x(), a);
    let out = select(e);
    assert_eq!(
        out.to_string(),
        "vpu.interleave.vw(vpu.zxt.vuh(vpu.interleave.vh(vpu.zxt.vub(a))))"
    );
}

#[test]
fn doubleword_subtract_has_no_pattern_and_is_untouched() {
    // Negating the constant exercises the full i64 range; the tables
    // have no doubleword adds, so the subtract survives as written.
    let a = Expr::var("a", Type::int(64).with_lanes(LANES));
    let e = a - Expr::int(5, Type::int(64));
    assert_eq!(select(e.clone()), e);
}

#[test]
fn scalar_arithmetic_is_untouched() {
    let a = Expr::var("a", Type::int(32));
    let b = Expr::var("b", Type::int(32));
    let e = a * b + Expr::int(1, Type::int(32));
    assert_eq!(select(e.clone()), e);
}
