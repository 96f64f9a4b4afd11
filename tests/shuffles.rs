//! Bounded indirect loads becoming lookup-table shuffles.

use laneopt::ir::expr::{clamp, max, min, BinOp, CallClass, Expr, Stmt};
use laneopt::pass::{upper_bound, OptimizeShuffles, Pass};
use laneopt::target::DYNAMIC_SHUFFLE;
use laneopt::Type;

const LANES: u32 = 64;

fn u8x() -> Type {
    Type::uint(8).with_lanes(LANES)
}

fn i32s() -> Type {
    Type::int(32)
}

fn optimize(s: &Stmt) -> Stmt {
    OptimizeShuffles::new().run(s)
}

fn optimize_expr(e: Expr) -> Expr {
    match optimize(&Stmt::Evaluate(e)) {
        Stmt::Evaluate(out) => out,
        other => panic!("unexpected statement {}", other),
    }
}

fn shuffle(ty: Type, lut: Expr, index8: Expr, extent: i64) -> Expr {
    Expr::call(
        ty,
        DYNAMIC_SHUFFLE,
        CallClass::Intrinsic,
        vec![lut, index8, Expr::int(0, i32s()), Expr::int(extent, i32s())],
    )
}

#[test]
fn byte_indexed_gather_becomes_a_full_table_shuffle() {
    let idx = Expr::var("i", u8x());
    let e = Expr::load(u8x(), "tbl", idx.clone());

    // A u8 index spans at most 256 entries by type alone.
    let base = Expr::int(0, Type::uint(8));
    let lut = Expr::load(
        Type::uint(8).with_lanes(256),
        "tbl",
        Expr::ramp(base.clone(), Expr::int(1, Type::uint(8)), 256),
    );
    let index8 = idx - base;
    assert_eq!(optimize_expr(e), shuffle(u8x(), lut, index8, 256));
}

#[test]
fn clamped_index_gets_a_trimmed_table() {
    let x = Expr::var("x", Type::int(32).with_lanes(LANES));
    let idx = clamp(x, Expr::int(10, i32s()), Expr::int(40, i32s()));
    let e = Expr::load(u8x(), "tbl", idx.clone());

    let base = Expr::int(10, i32s());
    let lut = Expr::load(
        Type::uint(8).with_lanes(31),
        "tbl",
        Expr::ramp(base.clone(), Expr::int(1, i32s()), 31),
    );
    let index8 = Expr::cast(u8x(), idx - base);
    assert_eq!(optimize_expr(e), shuffle(u8x(), lut, index8, 31));
}

#[test]
fn provable_symbolic_span_loads_the_full_table() {
    // The index is clamped to [0, min(n, 200)]. The span never folds to
    // a constant, but min(n, 200) is below 256 for every n, so the
    // rewrite falls back to the full 256-entry table.
    let x = Expr::var("x", Type::int(32).with_lanes(LANES));
    let n = Expr::var("n", i32s());
    let idx = max(
        min(min(x, n), Expr::int(200, i32s())),
        Expr::int(0, i32s()),
    );
    let e = Expr::load(u8x(), "tbl", idx.clone());

    let base = Expr::int(0, i32s());
    let lut = Expr::load(
        Type::uint(8).with_lanes(256),
        "tbl",
        Expr::ramp(base.clone(), Expr::int(1, i32s()), 256),
    );
    let index8 = Expr::cast(u8x(), idx - base);
    assert_eq!(optimize_expr(e), shuffle(u8x(), lut, index8, 256));
}

#[test]
fn span_of_256_is_one_too_many() {
    let x = Expr::var("x", Type::int(32).with_lanes(LANES));
    let idx = clamp(x, Expr::int(0, i32s()), Expr::int(256, i32s()));
    let e = Expr::load(u8x(), "tbl", idx);
    assert_eq!(optimize_expr(e.clone()), e);
}

#[test]
fn span_of_255_still_fits() {
    let x = Expr::var("x", Type::int(32).with_lanes(LANES));
    let idx = clamp(x, Expr::int(0, i32s()), Expr::int(255, i32s()));
    let e = Expr::load(u8x(), "tbl", idx);
    let out = optimize_expr(e);
    match out {
        Expr::Call { name, args, .. } => {
            assert_eq!(name, DYNAMIC_SHUFFLE);
            assert_eq!(args[3], Expr::int(256, i32s()));
        }
        other => panic!("expected a shuffle, got {}", other),
    }
}

#[test]
fn unbounded_wide_index_is_untouched() {
    let idx = Expr::var("i", Type::int(32).with_lanes(LANES));
    let e = Expr::load(u8x(), "tbl", idx);
    assert_eq!(optimize_expr(e.clone()), e);
}

#[test]
fn dense_ramp_loads_are_not_gathers() {
    let e = Expr::load(
        u8x(),
        "tbl",
        Expr::ramp(Expr::var("x", i32s()), Expr::int(1, i32s()), LANES),
    );
    assert_eq!(optimize_expr(e.clone()), e);
}

#[test]
fn scalar_loads_are_untouched() {
    let e = Expr::load(Type::uint(8), "tbl", Expr::var("i", i32s()));
    assert_eq!(optimize_expr(e.clone()), e);
}

#[test]
fn let_bound_indices_carry_their_bounds() {
    let x = Expr::var("x", Type::int(32).with_lanes(LANES));
    let ty = Type::int(32).with_lanes(LANES);
    let t = Expr::var("t", ty);
    let s = Stmt::let_stmt(
        "t",
        clamp(x, Expr::int(0, i32s()), Expr::int(9, i32s())),
        Stmt::Evaluate(Expr::load(u8x(), "tbl", t.clone())),
    );

    let base = Expr::int(0, i32s());
    let lut = Expr::load(
        Type::uint(8).with_lanes(10),
        "tbl",
        Expr::ramp(base.clone(), Expr::int(1, i32s()), 10),
    );
    let index8 = Expr::cast(u8x(), t - base);
    let expected = Stmt::let_stmt(
        "t",
        clamp(
            Expr::var("x", ty),
            Expr::int(0, i32s()),
            Expr::int(9, i32s()),
        ),
        Stmt::Evaluate(shuffle(u8x(), lut, index8, 10)),
    );
    assert_eq!(optimize(&s), expected);
}

#[test]
fn upper_bound_strips_matched_clamps() {
    let x = Expr::var("x", Type::int(32).with_lanes(LANES));
    let y = Expr::var("y", Type::int(32).with_lanes(LANES));
    let k = Expr::int(100, i32s());
    let e = Expr::binary(
        BinOp::Sub,
        max(x.clone(), k.clone()),
        max(y.clone(), k),
    );
    assert_eq!(upper_bound(&e), Expr::binary(BinOp::Sub, x, y));
}
