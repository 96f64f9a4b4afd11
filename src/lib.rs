//! laneopt: peephole instruction selection for the VPU vector coprocessor.
//!
//! Optimization pipeline over one function body:
//!
//! ```text
//! body → OptimizeShuffles → [indirect loads become LUT shuffles]
//!      → SelectInstructions → [portable vector ops become vpu.* calls]
//!      → EliminateInterleaves → [redundant lane-layout markers cancel]
//!      → downstream code generation
//! ```
//!
//! The VPU's wide loads and stores, and several of its arithmetic
//! instructions, operate on interleaved lane order. Instruction selection
//! therefore tags operands and results with `vpu.interleave.*` /
//! `vpu.deinterleave.*` markers, and a second pass cancels marker pairs so
//! that only the layout changes the hardware actually requires survive.
//! Every surviving marker costs one real shuffle instruction downstream.

pub mod analysis;
pub mod error;
pub mod interp;
pub mod ir;
pub mod pass;
pub mod target;

pub use error::EvalError;
pub use ir::expr::{BinOp, CallClass, Expr, Stmt};
pub use ir::types::{Type, TypeCode};
pub use pass::{optimize_instructions, optimize_shuffles};

/// Reports an internal invariant violation and halts translation.
///
/// These fire only on defects in the pattern tables or the passes
/// themselves, never on any input program. Halting is deliberate: the
/// alternative is a silent miscompile.
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        panic!("internal error: {}", format_args!($($arg)*))
    };
}

/// Asserts an internal invariant; see [`internal_error!`].
#[macro_export]
macro_rules! internal_assert {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::internal_error!($($arg)*);
        }
    };
}
