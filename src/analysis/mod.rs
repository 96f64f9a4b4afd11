//! Consumed analysis collaborators: the algebraic simplifier, common
//! subexpression elimination, bounds inference, lossless-cast queries,
//! and template substitution. The passes in `crate::pass` use these but
//! never extend them.

pub mod bounds;
pub mod cse;
pub mod lossless;
pub mod simplify;
pub mod substitute;

pub use bounds::{bounds_of_expr_in_scope, Interval};
pub use cse::common_subexpression_elimination;
pub use lossless::lossless_cast;
pub use simplify::{div_floor, mod_floor, simplify, wrap_to_type};
pub use substitute::substitute;
