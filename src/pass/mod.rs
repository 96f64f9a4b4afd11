//! The optimization passes and their driver.
//!
//! Two independent entry points cover one function body:
//! [`optimize_shuffles`] rewrites bounded indirect loads, and
//! [`optimize_instructions`] runs instruction selection immediately
//! followed by marker elimination. Callers order them; shuffle rewriting
//! normally runs first so selection sees the shuffle intrinsics.

pub mod engine;
pub mod interleave;
pub mod select;
pub mod shuffles;
pub mod tables;

pub use engine::apply_patterns;
pub use interleave::EliminateInterleaves;
pub use select::SelectInstructions;
pub use shuffles::{upper_bound, OptimizeShuffles};
pub use tables::{OperandMask, Pattern, PatternFlags, ADDS, CASTS, MULS};

use crate::ir::expr::Stmt;

/// A rewriting pass over one function body.
///
/// Passes must be deterministic: given the same body, the rewritten
/// output must be identical across runs. A pass never fails; anything it
/// cannot improve it returns unchanged.
pub trait Pass {
    /// Human-readable name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Rewrites the body.
    fn run(&mut self, body: &Stmt) -> Stmt;
}

/// An ordered sequence of passes with optional IR dumping.
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
    /// If set, dumps IR text to stderr after the pass with this name.
    dump_after: Option<String>,
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline {
            passes: Vec::new(),
            dump_after: None,
        }
    }

    /// Appends a pass to the end of the pipeline.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Dumps IR to stderr after the named pass completes.
    pub fn set_dump_after(&mut self, pass_name: impl Into<String>) {
        self.dump_after = Some(pass_name.into());
    }

    /// Runs all passes in registration order.
    pub fn run(&mut self, body: &Stmt) -> Stmt {
        let mut body = body.clone();
        for pass in &mut self.passes {
            body = pass.run(&body);
            if self.dump_after.as_deref() == Some(pass.name()) {
                eprintln!("--- IR after {} ---\n{}", pass.name(), body);
            }
        }
        body
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new()
    }
}

/// Replaces bounded indirect loads with `dynamic_shuffle` lookups.
pub fn optimize_shuffles(body: &Stmt) -> Stmt {
    let mut pipeline = Pipeline::new();
    pipeline.add_pass(OptimizeShuffles::new());
    pipeline.run(body)
}

/// Selects VPU instructions, then cancels the redundant lane-layout
/// markers selection introduced. The two passes only make sense in this
/// order; selection without elimination leaves markers that each cost a
/// real shuffle.
pub fn optimize_instructions(body: &Stmt) -> Stmt {
    let mut pipeline = Pipeline::new();
    pipeline.add_pass(SelectInstructions);
    pipeline.add_pass(EliminateInterleaves::new());
    pipeline.run(body)
}
