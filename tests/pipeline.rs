//! End-to-end runs of the whole pass stack: selection followed by
//! marker elimination, driven both through the entry points and through
//! a hand-built `Pipeline`.

use laneopt::interp::{eval, Env, Value};
use laneopt::ir::expr::{clamp, Expr, Stmt};
use laneopt::pass::{
    EliminateInterleaves, OptimizeShuffles, Pass, Pipeline, SelectInstructions,
};
use laneopt::target::vpu_op;
use laneopt::{optimize_instructions, optimize_shuffles, Type};

const LANES: u32 = 8;

fn u8x() -> Type {
    Type::uint(8).with_lanes(LANES)
}

fn i8x() -> Type {
    Type::int(8).with_lanes(LANES)
}

fn i16x() -> Type {
    Type::int(16).with_lanes(LANES)
}

fn i32x() -> Type {
    Type::int(32).with_lanes(LANES)
}

/// Widening multiply followed by a rounded saturating narrow. Selection
/// picks a widening multiply (which marks its result) and a
/// deinterleaving narrow; elimination then cancels the marker pair,
/// leaving two instructions and no shuffles.
fn rounded_product_narrow() -> Expr {
    let a = Expr::var("a", i8x());
    let b = Expr::var("b", i8x());
    let prod16 = Expr::cast(i16x(), a) * Expr::cast(i16x(), b);
    Expr::cast(
        u8x(),
        clamp(
            (Expr::cast(i32x(), prod16) + 128) / 256,
            Expr::int(0, Type::int(32)),
            Expr::int(255, Type::int(32)),
        ),
    )
}

#[test]
fn markers_cancel_across_select_and_eliminate() {
    let out = match optimize_instructions(&Stmt::Evaluate(rounded_product_narrow())) {
        Stmt::Evaluate(e) => e,
        other => panic!("unexpected statement {}", other),
    };
    assert_eq!(
        out.to_string(),
        "vpu.trunc_satub_rnd.vh(vpu.mpy.vb.vb(a, b))"
    );
}

#[test]
fn optimized_body_evaluates_identically() {
    let e = rounded_product_narrow();
    let optimized = match optimize_instructions(&Stmt::Evaluate(e.clone())) {
        Stmt::Evaluate(out) => out,
        other => panic!("unexpected statement {}", other),
    };

    let mut env = Env::new();
    env.bind(
        "a",
        Value::new(i8x(), vec![-128, 127, -1, 0, 1, 100, -100, 64]),
    );
    env.bind(
        "b",
        Value::new(i8x(), vec![-128, 127, 1, 99, -1, -2, 3, 64]),
    );
    let before = eval(&e, &mut env).unwrap();
    let after = eval(&optimized, &mut env).unwrap();
    assert_eq!(before.lanes, after.lanes);
}

fn averaging_loop() -> Stmt {
    let i = Expr::var("i", Type::int(32));
    let index = Expr::ramp(i * Expr::int(8, Type::int(32)), Expr::int(1, Type::int(32)), LANES);
    let a = Expr::load(u8x(), "a", index.clone());
    let b = Expr::load(u8x(), "b", index.clone());
    let wide = |e: Expr| Expr::cast(Type::uint(16).with_lanes(LANES), e);
    let value = Expr::cast(u8x(), (wide(a) + wide(b)) / 2);
    Stmt::for_loop(
        "i",
        Expr::int(0, Type::int(32)),
        Expr::var("n", Type::int(32)),
        Stmt::store("out", index, value),
    )
}

#[test]
fn loop_bodies_are_rewritten_in_place() {
    let s = averaging_loop();
    let out = optimize_instructions(&optimize_shuffles(&s));

    let i = Expr::var("i", Type::int(32));
    let index = Expr::ramp(i * Expr::int(8, Type::int(32)), Expr::int(1, Type::int(32)), LANES);
    let a = Expr::load(u8x(), "a", index.clone());
    let b = Expr::load(u8x(), "b", index.clone());
    let expected = Stmt::for_loop(
        "i",
        Expr::int(0, Type::int(32)),
        Expr::var("n", Type::int(32)),
        Stmt::store("out", index, vpu_op(u8x(), "vpu.avg.vub.vub", vec![a, b])),
    );
    assert_eq!(out, expected);
}

#[test]
fn pipeline_driver_matches_the_entry_points() {
    let s = averaging_loop();

    let mut pipeline = Pipeline::new();
    pipeline.add_pass(OptimizeShuffles::new());
    pipeline.add_pass(SelectInstructions);
    pipeline.add_pass(EliminateInterleaves::new());
    let via_pipeline = pipeline.run(&s);

    let via_entry_points = optimize_instructions(&optimize_shuffles(&s));
    assert_eq!(via_pipeline, via_entry_points);
}
