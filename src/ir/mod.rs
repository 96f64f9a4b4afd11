pub mod expr;
pub mod matcher;
pub mod mutate;
pub mod scope;
pub mod types;

pub use expr::{BinOp, CallClass, Expr, Stmt};
pub use matcher::{expr_match, MatchBindings, WILDCARD};
pub use mutate::{mutate_children, mutate_stmt_children, Mutator};
pub use scope::Scope;
pub use types::{Type, TypeCode};
