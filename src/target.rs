//! The VPU intrinsic catalogue and lane-layout marker machinery.
//!
//! Intrinsic names follow the operand-suffix scheme of the VPU ISA
//! manual: `v` prefixes a vector operand, `b`/`h`/`w` are signed 8/16/32
//! bit elements and `ub`/`uh`/`uw` their unsigned counterparts, so
//! `vpu.avg.vub.vub` averages two unsigned-byte vectors.

use std::sync::LazyLock;

use rustc_hash::FxHashSet;

use crate::internal_error;
use crate::ir::expr::{CallClass, Expr};

pub const INTERLEAVE_PREFIX: &str = "vpu.interleave";
pub const DEINTERLEAVE_PREFIX: &str = "vpu.deinterleave";

/// The lookup-table shuffle: `dynamic_shuffle(table, index, pad, length)`
/// gathers up to 256 lanes from an in-register table via 8-bit per-lane
/// indices.
pub const DYNAMIC_SHUFFLE: &str = "dynamic_shuffle";

/// Builds a call to a VPU intrinsic.
pub fn vpu_op(ty: crate::ir::types::Type, name: &str, args: Vec<Expr>) -> Expr {
    Expr::call(ty, name, CallClass::Extern, args)
}

fn marker_name(prefix: &str, bits: u32) -> &'static str {
    // Markers are keyed by element width; each survives as exactly one
    // lane-shuffle instruction downstream.
    match (prefix, bits) {
        ("vpu.interleave", 8) => "vpu.interleave.vb",
        ("vpu.interleave", 16) => "vpu.interleave.vh",
        ("vpu.interleave", 32) => "vpu.interleave.vw",
        ("vpu.deinterleave", 8) => "vpu.deinterleave.vb",
        ("vpu.deinterleave", 16) => "vpu.deinterleave.vh",
        ("vpu.deinterleave", 32) => "vpu.deinterleave.vw",
        _ => internal_error!(
            "no {} marker for element width {}",
            prefix,
            bits
        ),
    }
}

/// Wraps `x` in an interleave marker: a pure lane permutation from split
/// to sequential order. Never alters lane values.
pub fn native_interleave(x: Expr) -> Expr {
    let ty = x.ty();
    let name = marker_name(INTERLEAVE_PREFIX, ty.bits);
    Expr::call(ty, name, CallClass::Extern, vec![x])
}

/// Wraps `x` in a deinterleave marker, the syntactic inverse of
/// [`native_interleave`].
pub fn native_deinterleave(x: Expr) -> Expr {
    let ty = x.ty();
    let name = marker_name(DEINTERLEAVE_PREFIX, ty.bits);
    Expr::call(ty, name, CallClass::Extern, vec![x])
}

fn is_marker_op(x: &Expr, prefix: &str) -> bool {
    match x {
        Expr::Call { name, args, .. } => args.len() == 1 && name.starts_with(prefix),
        _ => false,
    }
}

pub fn is_native_interleave(x: &Expr) -> bool {
    is_marker_op(x, INTERLEAVE_PREFIX)
}

pub fn is_native_deinterleave(x: &Expr) -> bool {
    is_marker_op(x, DEINTERLEAVE_PREFIX)
}

/// Portable intrinsics through which a marker always moves freely: they
/// are pointwise in every lane.
pub static INTERLEAVABLE_INTRINSICS: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "bitwise_and",
        "bitwise_not",
        "bitwise_or",
        "bitwise_xor",
        "shift_left",
        "shift_right",
        "abs",
        "absd",
    ]
    .into_iter()
    .collect()
});

/// Intrinsics that are never layout-transparent.
///
/// The markers themselves are the cancellation base case and must not be
/// re-ordered past each other. Beyond those, any VPU intrinsic whose
/// vector operands all share the result's bit width and lane count is
/// assumed transparent; an intrinsic that breaks that assumption must be
/// listed here, because misclassifying it as transparent miscompiles.
pub static NON_TRANSPARENT_INTRINSICS: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "vpu.interleave.vb",
        "vpu.interleave.vh",
        "vpu.interleave.vw",
        "vpu.deinterleave.vb",
        "vpu.deinterleave.vh",
        "vpu.deinterleave.vw",
        DYNAMIC_SHUFFLE,
    ]
    .into_iter()
    .collect()
});

/// A self-interleaving alternative form of a narrowing intrinsic.
pub struct DeinterleavingAlt {
    pub name: &'static str,
    /// Extra trailing scalar arguments the alternative takes (as i32
    /// immediates).
    pub extra_args: &'static [i64],
}

/// The non-interleaving "pack" narrows and their self-interleaving
/// "trunc" duals. Selection emits the pack form; when the packed operand
/// already yields a marker, the eliminator substitutes the dual instead
/// of materializing the marker.
pub fn deinterleaving_alt(name: &str) -> Option<DeinterleavingAlt> {
    match name {
        "vpu.pack.vh" => Some(DeinterleavingAlt {
            name: "vpu.trunc.vh",
            extra_args: &[],
        }),
        "vpu.pack.vw" => Some(DeinterleavingAlt {
            name: "vpu.trunc.vw",
            extra_args: &[],
        }),
        "vpu.pack_satub.vh" => Some(DeinterleavingAlt {
            name: "vpu.trunc_satub.vh",
            extra_args: &[],
        }),
        "vpu.pack_sath.vw" => Some(DeinterleavingAlt {
            name: "vpu.trunc_sath.vw",
            extra_args: &[],
        }),
        // No plain trunc_satuh exists; the shift-saturate-narrow with a
        // shift of zero does the same job.
        "vpu.pack_satuh.vw" => Some(DeinterleavingAlt {
            name: "vpu.trunc_satuh_shr.vw.w",
            extra_args: &[0],
        }),
        _ => None,
    }
}
