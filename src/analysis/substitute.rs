//! Named-variable substitution.

use crate::ir::expr::Expr;
use crate::ir::mutate::{mutate_children, Mutator};

struct Substitutor<'a> {
    name: &'a str,
    replacement: &'a Expr,
}

impl Mutator for Substitutor<'_> {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e {
            Expr::Var { name, .. } if name == self.name => self.replacement.clone(),
            Expr::Let { name, value, body } if name == self.name => {
                // The let shadows the substituted name in its body.
                Expr::Let {
                    name: name.clone(),
                    value: Box::new(self.mutate_expr(value)),
                    body: body.clone(),
                }
            }
            _ => mutate_children(self, e),
        }
    }
}

/// Replaces every free occurrence of variable `name` in `e` with
/// `replacement`.
pub fn substitute(name: &str, replacement: &Expr, e: &Expr) -> Expr {
    let mut s = Substitutor { name, replacement };
    s.mutate_expr(e)
}
