//! The static pattern catalogue: ordered tables of (intrinsic, template,
//! flags) records, grouped by the root node kind the selector fires on.
//!
//! Tables are matched top to bottom and the first structural match wins,
//! so ordering encodes specificity. A general catch-all must sit at the
//! bottom of its table.

use std::sync::LazyLock;

use crate::internal_error;
use crate::ir::expr::{max, min, shift_left, shift_right, Expr};
use crate::ir::matcher::WILDCARD;
use crate::ir::types::Type;

/// Which of the first three bound operands a flag applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperandMask([bool; 3]);

impl OperandMask {
    pub const NONE: OperandMask = OperandMask([false, false, false]);
    pub const OP0: OperandMask = OperandMask([true, false, false]);
    pub const OP1: OperandMask = OperandMask([false, true, false]);
    pub const OP2: OperandMask = OperandMask([false, false, true]);
    pub const OP12: OperandMask = OperandMask([false, true, true]);
    pub const ALL: OperandMask = OperandMask([true, true, true]);

    pub fn has(self, i: usize) -> bool {
        i < 3 && self.0[i]
    }
}

/// Post-match operand coercions and layout tags, as named fields rather
/// than packed bits. A mask must never name an operand index beyond the
/// template's wildcard count.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternFlags {
    /// Wrap the whole rewritten call in an interleave marker.
    pub interleave_result: bool,
    /// Exchange operands 0 and 1 before building the call.
    pub swap_ops_01: bool,
    /// Exchange operands 1 and 2 before building the call.
    pub swap_ops_12: bool,
    /// Replace the operand with a provably-lossless half-width cast.
    pub narrow: OperandMask,
    /// As `narrow`, but force the half-width type unsigned.
    pub narrow_unsigned: OperandMask,
    /// Require a compile-time power of two and replace the operand with
    /// its scalar log base 2. Captures shifts hiding in div/mul.
    pub exact_log2: OperandMask,
    /// Wrap the operand in a deinterleave marker.
    pub deinterleave: OperandMask,
}

impl PatternFlags {
    pub const NONE: PatternFlags = PatternFlags {
        interleave_result: false,
        swap_ops_01: false,
        swap_ops_12: false,
        narrow: OperandMask::NONE,
        narrow_unsigned: OperandMask::NONE,
        exact_log2: OperandMask::NONE,
        deinterleave: OperandMask::NONE,
    };

    pub const fn interleave_result(mut self) -> Self {
        self.interleave_result = true;
        self
    }

    pub const fn swap_ops_12(mut self) -> Self {
        self.swap_ops_12 = true;
        self
    }

    pub const fn narrow(mut self, ops: OperandMask) -> Self {
        self.narrow = ops;
        self
    }

    pub const fn narrow_unsigned(mut self, ops: OperandMask) -> Self {
        self.narrow_unsigned = ops;
        self
    }

    pub const fn exact_log2(mut self, ops: OperandMask) -> Self {
        self.exact_log2 = ops;
        self
    }

    pub const fn deinterleave(mut self, ops: OperandMask) -> Self {
        self.deinterleave = ops;
        self
    }
}

/// One rewrite rule: a template with typed wildcard leaves, the VPU
/// intrinsic the bound operands feed, and the coercions in between.
pub struct Pattern {
    pub intrin: &'static str,
    pub template: Expr,
    pub flags: PatternFlags,
}

impl Pattern {
    fn new(intrin: &'static str, template: Expr, flags: PatternFlags) -> Pattern {
        Pattern {
            intrin,
            template,
            flags,
        }
    }
}

const NONE: PatternFlags = PatternFlags::NONE;
const NARROW_OPS: PatternFlags = PatternFlags::NONE.narrow(OperandMask::ALL);
const NARROW_UNSIGNED_OPS: PatternFlags = PatternFlags::NONE.narrow_unsigned(OperandMask::ALL);
const INTERLEAVE_NARROW_OPS: PatternFlags = NARROW_OPS.interleave_result();
/// Accumulating widening ops deinterleave the accumulator and
/// reinterleave the result.
const REINTERLEAVE_OP0: PatternFlags =
    PatternFlags::NONE.interleave_result().deinterleave(OperandMask::OP0);

// ---------------------------------------------------------------------------
// Template leaves
// ---------------------------------------------------------------------------

fn wild(ty: Type) -> Expr {
    Expr::var(WILDCARD, ty)
}

fn wild_u16() -> Expr {
    wild(Type::uint(16))
}

fn wild_u32() -> Expr {
    wild(Type::uint(32))
}

fn wild_i16() -> Expr {
    wild(Type::int(16))
}

fn wild_i32() -> Expr {
    wild(Type::int(32))
}

pub(crate) fn wild_u8x() -> Expr {
    wild(Type::uint(8).with_lanes(0))
}

pub(crate) fn wild_u16x() -> Expr {
    wild(Type::uint(16).with_lanes(0))
}

pub(crate) fn wild_u32x() -> Expr {
    wild(Type::uint(32).with_lanes(0))
}

pub(crate) fn wild_i8x() -> Expr {
    wild(Type::int(8).with_lanes(0))
}

pub(crate) fn wild_i16x() -> Expr {
    wild(Type::int(16).with_lanes(0))
}

pub(crate) fn wild_i32x() -> Expr {
    wild(Type::int(32).with_lanes(0))
}

pub(crate) fn wild_i64x() -> Expr {
    wild(Type::int(64).with_lanes(0))
}

/// A broadcast with a wildcard lane count, for scalar operands of
/// vector-by-scalar instructions.
fn bc(e: Expr) -> Expr {
    Expr::broadcast(e, 0)
}

// ---------------------------------------------------------------------------
// Cast helpers
// ---------------------------------------------------------------------------

fn cast_to(elem: Type, e: Expr) -> Expr {
    let lanes = e.ty().lanes;
    Expr::cast(elem.with_lanes(lanes), e)
}

pub(crate) fn u8(e: Expr) -> Expr {
    cast_to(Type::uint(8), e)
}

pub(crate) fn i8(e: Expr) -> Expr {
    cast_to(Type::int(8), e)
}

pub(crate) fn u16(e: Expr) -> Expr {
    cast_to(Type::uint(16), e)
}

pub(crate) fn i16(e: Expr) -> Expr {
    cast_to(Type::int(16), e)
}

pub(crate) fn u32(e: Expr) -> Expr {
    cast_to(Type::uint(32), e)
}

pub(crate) fn i32(e: Expr) -> Expr {
    cast_to(Type::int(32), e)
}

fn range_imm(of: Type, as_ty: Type, f: fn(Type) -> Option<i64>) -> Expr {
    match f(of) {
        Some(v) => Expr::int(v, as_ty),
        None => internal_error!("type {} has no integer range", of),
    }
}

/// A clamp of `e` to the range of `target`, with the bounds typed as
/// `e`'s element type. The simplifier removes `max(x, 0)` for unsigned
/// `x`, so the template for an unsigned source drops it too.
fn simplified_clamp(e: Expr, target: Type) -> Expr {
    let wide = e.ty().element_of().with_lanes(1);
    let lo = range_imm(target, wide, Type::min_value);
    let hi = range_imm(target, wide, Type::max_value);
    if e.ty().is_uint() && matches!(target.min_value(), Some(0)) {
        min(e, hi)
    } else {
        min(max(e, lo), hi)
    }
}

fn sat_cast(target: Type, e: Expr) -> Expr {
    cast_to(target, simplified_clamp(e, target))
}

pub(crate) fn u8c(e: Expr) -> Expr {
    sat_cast(Type::uint(8), e)
}

pub(crate) fn i8c(e: Expr) -> Expr {
    sat_cast(Type::int(8), e)
}

pub(crate) fn u16c(e: Expr) -> Expr {
    sat_cast(Type::uint(16), e)
}

pub(crate) fn i16c(e: Expr) -> Expr {
    sat_cast(Type::int(16), e)
}

pub(crate) fn i32c(e: Expr) -> Expr {
    sat_cast(Type::int(32), e)
}

// ---------------------------------------------------------------------------
// The tables
// ---------------------------------------------------------------------------

/// Patterns rooted at a vector cast.
pub static CASTS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        // Averaging.
        Pattern::new(
            "vpu.avg.vub.vub",
            u8((wild_u16x() + wild_u16x()) / 2),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.avg.vuh.vuh",
            u16((wild_u32x() + wild_u32x()) / 2),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.avg.vh.vh",
            i16((wild_i32x() + wild_i32x()) / 2),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.avg.vw.vw",
            i32((wild_i64x() + wild_i64x()) / 2),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.avg_rnd.vub.vub",
            u8((wild_u16x() + wild_u16x() + 1) / 2),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.avg_rnd.vuh.vuh",
            u16((wild_u32x() + wild_u32x() + 1) / 2),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.avg_rnd.vh.vh",
            i16((wild_i32x() + wild_i32x() + 1) / 2),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.avg_rnd.vw.vw",
            i32((wild_i64x() + wild_i64x() + 1) / 2),
            NARROW_OPS,
        ),
        // Negative averaging. There is no unsigned word variant.
        Pattern::new(
            "vpu.navg.vub.vub",
            i8c((wild_i16x() - wild_i16x()) / 2),
            NARROW_UNSIGNED_OPS,
        ),
        Pattern::new(
            "vpu.navg.vh.vh",
            i16c((wild_i32x() - wild_i32x()) / 2),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.navg.vw.vw",
            i32c((wild_i64x() - wild_i64x()) / 2),
            NARROW_OPS,
        ),
        // Saturating add/subtract.
        Pattern::new(
            "vpu.satub_add.vub.vub",
            u8c(wild_u16x() + wild_u16x()),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.satuh_add.vuh.vuh",
            u16c(wild_u32x() + wild_u32x()),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.sath_add.vh.vh",
            i16c(wild_i32x() + wild_i32x()),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.satw_add.vw.vw",
            i32c(wild_i64x() + wild_i64x()),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.satub_sub.vub.vub",
            u8c(wild_i16x() - wild_i16x()),
            NARROW_UNSIGNED_OPS,
        ),
        Pattern::new(
            "vpu.satuh_sub.vuh.vuh",
            u16c(wild_i32x() - wild_i32x()),
            NARROW_UNSIGNED_OPS,
        ),
        Pattern::new(
            "vpu.sath_sub.vh.vh",
            i16c(wild_i32x() - wild_i32x()),
            NARROW_OPS,
        ),
        Pattern::new(
            "vpu.satw_sub.vw.vw",
            i32c(wild_i64x() - wild_i64x()),
            NARROW_OPS,
        ),
        // Saturating narrowing casts with rounding.
        Pattern::new(
            "vpu.trunc_satub_rnd.vh",
            u8c((wild_i32x() + 128) / 256),
            PatternFlags::NONE
                .deinterleave(OperandMask::OP0)
                .narrow(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunc_satb_rnd.vh",
            i8c((wild_i32x() + 128) / 256),
            PatternFlags::NONE
                .deinterleave(OperandMask::OP0)
                .narrow(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunc_satuh_rnd.vw",
            u16c((wild_i64x() + 32768) / 65536),
            PatternFlags::NONE
                .deinterleave(OperandMask::OP0)
                .narrow(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunc_sath_rnd.vw",
            i16c((wild_i64x() + 32768) / 65536),
            PatternFlags::NONE
                .deinterleave(OperandMask::OP0)
                .narrow(OperandMask::OP0),
        ),
        // Saturating narrowing casts.
        Pattern::new(
            "vpu.trunc_satub_shr.vh.h",
            u8c(shift_right(wild_i16x(), wild_i16())),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunc_satuh_shr.vw.w",
            u16c(shift_right(wild_i32x(), wild_i32())),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunc_sath_shr.vw.w",
            i16c(shift_right(wild_i32x(), wild_i32())),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunc_satub_shr.vh.h",
            u8c(wild_i16x() / wild_i16()),
            PatternFlags::NONE
                .deinterleave(OperandMask::OP0)
                .exact_log2(OperandMask::OP1),
        ),
        Pattern::new(
            "vpu.trunc_satuh_shr.vw.w",
            u16c(wild_i32x() / wild_i32()),
            PatternFlags::NONE
                .deinterleave(OperandMask::OP0)
                .exact_log2(OperandMask::OP1),
        ),
        Pattern::new(
            "vpu.trunc_sath_shr.vw.w",
            i16c(wild_i32x() / wild_i32()),
            PatternFlags::NONE
                .deinterleave(OperandMask::OP0)
                .exact_log2(OperandMask::OP1),
        ),
        // Saturating narrows have both a non-interleaving (pack) and a
        // self-interleaving (trunc) instruction. We cannot tell which is
        // better until markers settle, so the pack form is matched here
        // and swapped for its dual later when that cancels a marker.
        Pattern::new("vpu.pack_satub.vh", u8c(wild_i16x()), NONE),
        Pattern::new("vpu.pack_satuh.vw", u16c(wild_i32x()), NONE),
        Pattern::new("vpu.pack_satb.vh", i8c(wild_i16x()), NONE),
        Pattern::new("vpu.pack_sath.vw", i16c(wild_i32x()), NONE),
        // Narrowing casts that keep the high half.
        Pattern::new(
            "vpu.trunclo.vh",
            u8(wild_u16x() / 256),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunclo.vh",
            u8(wild_i16x() / 256),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunclo.vh",
            i8(wild_u16x() / 256),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunclo.vh",
            i8(wild_i16x() / 256),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunclo.vw",
            u16(wild_u32x() / 65536),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunclo.vw",
            u16(wild_i32x() / 65536),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunclo.vw",
            i16(wild_u32x() / 65536),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunclo.vw",
            i16(wild_i32x() / 65536),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunc_shr.vw.w",
            i16(shift_right(wild_i32x(), wild_i32())),
            PatternFlags::NONE.deinterleave(OperandMask::OP0),
        ),
        Pattern::new(
            "vpu.trunc_shr.vw.w",
            i16(wild_i32x() / wild_i32()),
            PatternFlags::NONE
                .deinterleave(OperandMask::OP0)
                .exact_log2(OperandMask::OP1),
        ),
        // Truncating narrows, with the same pack/trunc duality as the
        // saturating ones above.
        Pattern::new("vpu.pack.vh", u8(wild_u16x()), NONE),
        Pattern::new("vpu.pack.vh", u8(wild_i16x()), NONE),
        Pattern::new("vpu.pack.vh", i8(wild_u16x()), NONE),
        Pattern::new("vpu.pack.vh", i8(wild_i16x()), NONE),
        Pattern::new("vpu.pack.vw", u16(wild_u32x()), NONE),
        Pattern::new("vpu.pack.vw", u16(wild_i32x()), NONE),
        Pattern::new("vpu.pack.vw", i16(wild_u32x()), NONE),
        Pattern::new("vpu.pack.vw", i16(wild_i32x()), NONE),
        // Widening casts. The hardware widens into split lane order, so
        // the result needs an interleave to restore sequential order.
        Pattern::new(
            "vpu.zxt.vub",
            u16(wild_u8x()),
            PatternFlags::NONE.interleave_result(),
        ),
        Pattern::new(
            "vpu.zxt.vub",
            i16(wild_u8x()),
            PatternFlags::NONE.interleave_result(),
        ),
        Pattern::new(
            "vpu.zxt.vuh",
            u32(wild_u16x()),
            PatternFlags::NONE.interleave_result(),
        ),
        Pattern::new(
            "vpu.zxt.vuh",
            i32(wild_u16x()),
            PatternFlags::NONE.interleave_result(),
        ),
        Pattern::new(
            "vpu.sxt.vb",
            u16(wild_i8x()),
            PatternFlags::NONE.interleave_result(),
        ),
        Pattern::new(
            "vpu.sxt.vb",
            i16(wild_i8x()),
            PatternFlags::NONE.interleave_result(),
        ),
        Pattern::new(
            "vpu.sxt.vh",
            u32(wild_i16x()),
            PatternFlags::NONE.interleave_result(),
        ),
        Pattern::new(
            "vpu.sxt.vh",
            i32(wild_i16x()),
            PatternFlags::NONE.interleave_result(),
        ),
    ]
});

/// Patterns rooted at a vector multiply.
pub static MULS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        // Vector by scalar widening multiplies.
        Pattern::new(
            "vpu.mpy.vub.ub",
            wild_u16x() * bc(wild_u16()),
            INTERLEAVE_NARROW_OPS,
        ),
        Pattern::new(
            "vpu.mpy.vub.b",
            wild_i16x() * bc(wild_i16()),
            PatternFlags::NONE
                .interleave_result()
                .narrow_unsigned(OperandMask::OP0)
                .narrow(OperandMask::OP1),
        ),
        Pattern::new(
            "vpu.mpy.vuh.uh",
            wild_u32x() * bc(wild_u32()),
            INTERLEAVE_NARROW_OPS,
        ),
        Pattern::new(
            "vpu.mpy.vh.h",
            wild_i32x() * bc(wild_i32()),
            INTERLEAVE_NARROW_OPS,
        ),
        // Widening vector multiplies.
        Pattern::new(
            "vpu.mpy.vub.vub",
            wild_u16x() * wild_u16x(),
            INTERLEAVE_NARROW_OPS,
        ),
        Pattern::new(
            "vpu.mpy.vuh.vuh",
            wild_u32x() * wild_u32x(),
            INTERLEAVE_NARROW_OPS,
        ),
        Pattern::new(
            "vpu.mpy.vb.vb",
            wild_i16x() * wild_i16x(),
            INTERLEAVE_NARROW_OPS,
        ),
        Pattern::new(
            "vpu.mpy.vh.vh",
            wild_i32x() * wild_i32x(),
            INTERLEAVE_NARROW_OPS,
        ),
        // Mixed-sign widening multiplies.
        Pattern::new(
            "vpu.mpy.vub.vb",
            wild_i16x() * wild_i16x(),
            PatternFlags::NONE
                .interleave_result()
                .narrow_unsigned(OperandMask::OP0)
                .narrow(OperandMask::OP1),
        ),
        Pattern::new(
            "vpu.mpy.vh.vuh",
            wild_i32x() * wild_i32x(),
            PatternFlags::NONE
                .interleave_result()
                .narrow(OperandMask::OP0)
                .narrow_unsigned(OperandMask::OP1),
        ),
    ]
});

/// Patterns rooted at a vector add.
pub static ADDS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        // Shift-accumulates.
        Pattern::new(
            "vpu.add_shr.vw.vw.w",
            wild_i32x() + shift_right(wild_i32x(), bc(wild_i32())),
            NONE,
        ),
        Pattern::new(
            "vpu.add_shl.vw.vw.w",
            wild_i32x() + shift_left(wild_i32x(), bc(wild_i32())),
            NONE,
        ),
        Pattern::new(
            "vpu.add_shl.vw.vw.w",
            wild_u32x() + shift_left(wild_u32x(), bc(wild_u32())),
            NONE,
        ),
        Pattern::new(
            "vpu.add_shr.vw.vw.w",
            wild_i32x() + wild_i32x() / bc(wild_i32()),
            PatternFlags::NONE.exact_log2(OperandMask::OP2),
        ),
        Pattern::new(
            "vpu.add_shl.vw.vw.w",
            wild_i32x() + wild_i32x() * bc(wild_i32()),
            PatternFlags::NONE.exact_log2(OperandMask::OP2),
        ),
        Pattern::new(
            "vpu.add_shl.vw.vw.w",
            wild_u32x() + wild_u32x() * bc(wild_u32()),
            PatternFlags::NONE.exact_log2(OperandMask::OP2),
        ),
        Pattern::new(
            "vpu.add_shl.vw.vw.w",
            wild_i32x() + bc(wild_i32()) * wild_i32x(),
            PatternFlags::NONE.exact_log2(OperandMask::OP1).swap_ops_12(),
        ),
        Pattern::new(
            "vpu.add_shl.vw.vw.w",
            wild_u32x() + bc(wild_u32()) * wild_u32x(),
            PatternFlags::NONE.exact_log2(OperandMask::OP1).swap_ops_12(),
        ),
        // Widening multiply-accumulates with a scalar.
        Pattern::new(
            "vpu.add_mpy.vuh.vub.ub",
            wild_u16x() + wild_u16x() * bc(wild_u16()),
            REINTERLEAVE_OP0.narrow(OperandMask::OP12),
        ),
        Pattern::new(
            "vpu.add_mpy.vh.vub.b",
            wild_i16x() + wild_i16x() * bc(wild_i16()),
            REINTERLEAVE_OP0
                .narrow_unsigned(OperandMask::OP1)
                .narrow(OperandMask::OP2),
        ),
        Pattern::new(
            "vpu.add_mpy.vuw.vuh.uh",
            wild_u32x() + wild_u32x() * bc(wild_u32()),
            REINTERLEAVE_OP0.narrow(OperandMask::OP12),
        ),
        Pattern::new(
            "vpu.add_mpy.vuh.vub.ub",
            wild_u16x() + bc(wild_u16()) * wild_u16x(),
            REINTERLEAVE_OP0.narrow(OperandMask::OP12).swap_ops_12(),
        ),
        Pattern::new(
            "vpu.add_mpy.vh.vub.b",
            wild_i16x() + bc(wild_i16()) * wild_i16x(),
            REINTERLEAVE_OP0
                .narrow(OperandMask::OP1)
                .narrow_unsigned(OperandMask::OP2)
                .swap_ops_12(),
        ),
        Pattern::new(
            "vpu.add_mpy.vuw.vuh.uh",
            wild_u32x() + bc(wild_u32()) * wild_u32x(),
            REINTERLEAVE_OP0.narrow(OperandMask::OP12).swap_ops_12(),
        ),
        // The instruction saturates where these templates wrap, but
        // 32 bit signed overflow is undefined in the source language, so
        // the mismatch is unobservable for well defined programs.
        Pattern::new(
            "vpu.satw_add_mpy.vw.vh.h",
            wild_i32x() + wild_i32x() * bc(wild_i32()),
            REINTERLEAVE_OP0.narrow(OperandMask::OP12),
        ),
        Pattern::new(
            "vpu.satw_add_mpy.vw.vh.h",
            wild_i32x() + bc(wild_i32()) * wild_i32x(),
            REINTERLEAVE_OP0.narrow(OperandMask::OP12).swap_ops_12(),
        ),
        // Non-widening multiply-accumulates with a scalar.
        Pattern::new(
            "vpu.add_mul.vh.vh.b",
            wild_i16x() + wild_i16x() * bc(wild_i16()),
            PatternFlags::NONE.narrow(OperandMask::OP2),
        ),
        Pattern::new(
            "vpu.add_mul.vw.vw.h",
            wild_i32x() + wild_i32x() * bc(wild_i32()),
            PatternFlags::NONE.narrow(OperandMask::OP2),
        ),
        Pattern::new(
            "vpu.add_mul.vh.vh.b",
            wild_i16x() + bc(wild_i16()) * wild_i16x(),
            PatternFlags::NONE.narrow(OperandMask::OP1).swap_ops_12(),
        ),
        Pattern::new(
            "vpu.add_mul.vw.vw.h",
            wild_i32x() + bc(wild_i32()) * wild_i32x(),
            PatternFlags::NONE.narrow(OperandMask::OP1).swap_ops_12(),
        ),
        // Widening multiply-accumulates.
        Pattern::new(
            "vpu.add_mpy.vuh.vub.vub",
            wild_u16x() + wild_u16x() * wild_u16x(),
            REINTERLEAVE_OP0.narrow(OperandMask::OP12),
        ),
        Pattern::new(
            "vpu.add_mpy.vuw.vuh.vuh",
            wild_u32x() + wild_u32x() * wild_u32x(),
            REINTERLEAVE_OP0.narrow(OperandMask::OP12),
        ),
        Pattern::new(
            "vpu.add_mpy.vh.vb.vb",
            wild_i16x() + wild_i16x() * wild_i16x(),
            REINTERLEAVE_OP0.narrow(OperandMask::OP12),
        ),
        Pattern::new(
            "vpu.add_mpy.vw.vh.vh",
            wild_i32x() + wild_i32x() * wild_i32x(),
            REINTERLEAVE_OP0.narrow(OperandMask::OP12),
        ),
        // Mixed-sign widening multiply-accumulates.
        Pattern::new(
            "vpu.add_mpy.vh.vub.vb",
            wild_i16x() + wild_i16x() * wild_i16x(),
            REINTERLEAVE_OP0
                .narrow_unsigned(OperandMask::OP1)
                .narrow(OperandMask::OP2),
        ),
        Pattern::new(
            "vpu.add_mpy.vw.vh.vuh",
            wild_i32x() + wild_i32x() * wild_i32x(),
            REINTERLEAVE_OP0
                .narrow(OperandMask::OP1)
                .narrow_unsigned(OperandMask::OP2),
        ),
        Pattern::new(
            "vpu.add_mpy.vh.vub.vb",
            wild_i16x() + wild_i16x() * wild_i16x(),
            REINTERLEAVE_OP0
                .narrow(OperandMask::OP1)
                .narrow_unsigned(OperandMask::OP2)
                .swap_ops_12(),
        ),
        Pattern::new(
            "vpu.add_mpy.vw.vh.vuh",
            wild_i32x() + wild_i32x() * wild_i32x(),
            REINTERLEAVE_OP0
                .narrow_unsigned(OperandMask::OP1)
                .narrow(OperandMask::OP2)
                .swap_ops_12(),
        ),
        // Very general, must come last.
        Pattern::new(
            "vpu.add_mul.vh.vh.vh",
            wild_i16x() + wild_i16x() * wild_i16x(),
            NONE,
        ),
    ]
});
