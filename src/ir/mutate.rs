//! Generic tree-rewrite traversal.
//!
//! Each pass implements [`Mutator`], overriding `mutate_expr` with a match
//! on the node kinds it cares about and explicitly falling back to
//! [`mutate_children`] for the rest. Passes must be deterministic: given
//! the same tree, the rewritten output must be identical across runs (no
//! global mutable state, no randomness).

use crate::ir::expr::{Expr, Stmt};

pub trait Mutator {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        mutate_children(self, e)
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        mutate_stmt_children(self, s)
    }
}

/// Rebuilds `e` from its mutated children. The default behavior of every
/// expression kind a pass does not handle itself.
pub fn mutate_children<M: Mutator + ?Sized>(m: &mut M, e: &Expr) -> Expr {
    match e {
        Expr::IntImm { .. } | Expr::Var { .. } => e.clone(),
        Expr::Cast { ty, value } => Expr::Cast {
            ty: *ty,
            value: Box::new(m.mutate_expr(value)),
        },
        Expr::Binary { op, a, b } => Expr::Binary {
            op: *op,
            a: Box::new(m.mutate_expr(a)),
            b: Box::new(m.mutate_expr(b)),
        },
        Expr::Not { a } => Expr::Not {
            a: Box::new(m.mutate_expr(a)),
        },
        Expr::Select {
            cond,
            true_value,
            false_value,
        } => Expr::Select {
            cond: Box::new(m.mutate_expr(cond)),
            true_value: Box::new(m.mutate_expr(true_value)),
            false_value: Box::new(m.mutate_expr(false_value)),
        },
        Expr::Let { name, value, body } => Expr::Let {
            name: name.clone(),
            value: Box::new(m.mutate_expr(value)),
            body: Box::new(m.mutate_expr(body)),
        },
        Expr::Load { ty, name, index } => Expr::Load {
            ty: *ty,
            name: name.clone(),
            index: Box::new(m.mutate_expr(index)),
        },
        Expr::Broadcast { value, lanes } => Expr::Broadcast {
            value: Box::new(m.mutate_expr(value)),
            lanes: *lanes,
        },
        Expr::Ramp {
            base,
            stride,
            lanes,
        } => Expr::Ramp {
            base: Box::new(m.mutate_expr(base)),
            stride: Box::new(m.mutate_expr(stride)),
            lanes: *lanes,
        },
        Expr::Call {
            ty,
            name,
            class,
            args,
        } => Expr::Call {
            ty: *ty,
            name: name.clone(),
            class: *class,
            args: args.iter().map(|a| m.mutate_expr(a)).collect(),
        },
    }
}

/// Rebuilds `s` from its mutated children.
pub fn mutate_stmt_children<M: Mutator + ?Sized>(m: &mut M, s: &Stmt) -> Stmt {
    match s {
        Stmt::LetStmt { name, value, body } => Stmt::LetStmt {
            name: name.clone(),
            value: m.mutate_expr(value),
            body: Box::new(m.mutate_stmt(body)),
        },
        Stmt::For {
            var,
            min,
            extent,
            body,
        } => Stmt::For {
            var: var.clone(),
            min: m.mutate_expr(min),
            extent: m.mutate_expr(extent),
            body: Box::new(m.mutate_stmt(body)),
        },
        Stmt::Store { name, index, value } => Stmt::Store {
            name: name.clone(),
            index: m.mutate_expr(index),
            value: m.mutate_expr(value),
        },
        Stmt::Evaluate(e) => Stmt::Evaluate(m.mutate_expr(e)),
        Stmt::Block(stmts) => Stmt::Block(stmts.iter().map(|s| m.mutate_stmt(s)).collect()),
    }
}
