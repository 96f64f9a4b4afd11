//! Cancellation of redundant lane-layout markers.
//!
//! Instruction selection tags values liberally with interleave and
//! deinterleave markers. This pass pushes interleaves toward the root of
//! the tree, using the fact that a pure lane permutation commutes with
//! pointwise operations; when an interleave meets a deinterleave they
//! cancel. Every marker that survives lowers to a real shuffle
//! instruction, so fewer is strictly better.

use crate::ir::expr::{expr_uses_var, stmt_uses_var, Expr, Stmt};
use crate::ir::mutate::{mutate_children, mutate_stmt_children, Mutator};
use crate::ir::scope::Scope;
use crate::ir::types::Type;
use crate::pass::Pass;
use crate::target::{
    deinterleaving_alt, is_native_deinterleave, is_native_interleave, native_interleave,
    INTERLEAVABLE_INTRINSICS, NON_TRANSPARENT_INTRINSICS,
};
use crate::{internal_assert, internal_error};

fn shadow_name(name: &str) -> String {
    format!("{}.deinterleaved", name)
}

/// A node kind that can carry a let binding; lets over expressions and
/// over statements get identical rebinding treatment.
trait LetNode: Clone + PartialEq {
    fn uses_var(&self, name: &str) -> bool;
    fn make_let(name: String, value: Expr, body: Self) -> Self;
}

impl LetNode for Expr {
    fn uses_var(&self, name: &str) -> bool {
        expr_uses_var(self, name)
    }

    fn make_let(name: String, value: Expr, body: Expr) -> Expr {
        Expr::let_in(name, value, body)
    }
}

impl LetNode for Stmt {
    fn uses_var(&self, name: &str) -> bool {
        stmt_uses_var(self, name)
    }

    fn make_let(name: String, value: Expr, body: Stmt) -> Stmt {
        Stmt::let_stmt(name, value, body)
    }
}

/// The marker-cancellation pass.
pub struct EliminateInterleaves {
    /// Names whose deinterleaved shadow binding is in scope.
    vars: Scope<bool>,
}

impl EliminateInterleaves {
    pub fn new() -> EliminateInterleaves {
        EliminateInterleaves { vars: Scope::new() }
    }

    /// True if `x` is an interleave, or can pretend to be one: scalars
    /// and broadcasts are invariant under lane permutation, and a
    /// variable with a deinterleaved shadow in scope can be rewritten to
    /// reference it.
    fn yields_interleave(&self, x: &Expr) -> bool {
        if is_native_interleave(x) {
            return true;
        }
        if x.ty().is_scalar() || matches!(x, Expr::Broadcast { .. }) {
            return true;
        }
        matches!(x, Expr::Var { name, .. } if self.vars.contains(&shadow_name(name)))
    }

    /// True if at least one of `exprs` is literally an interleave and
    /// every one of them yields an interleave. Stripping markers is only
    /// profitable when it actually removes one.
    fn yields_removable_interleave(&self, exprs: &[&Expr]) -> bool {
        let mut any = false;
        for x in exprs {
            if is_native_interleave(x) {
                any = true;
            } else if !self.yields_interleave(x) {
                return false;
            }
        }
        any
    }

    /// The expression being interleaved. Only valid for values proven by
    /// [`Self::yields_interleave`]; anything else is a pass defect.
    fn remove_interleave(&self, x: &Expr) -> Expr {
        if is_native_interleave(x) {
            if let Expr::Call { args, .. } = x {
                return args[0].clone();
            }
        }
        if x.ty().is_scalar() || matches!(x, Expr::Broadcast { .. }) {
            return x.clone();
        }
        if let Expr::Var { name, ty } = x {
            let shadow = shadow_name(name);
            internal_assert!(
                self.vars.contains(&shadow),
                "variable {} has no deinterleaved shadow",
                name
            );
            return Expr::var(shadow, *ty);
        }
        internal_error!("expression '{}' does not yield an interleave", x);
    }

    fn visit_let<T>(
        &mut self,
        name: &str,
        value: &Expr,
        body: &T,
        mutate_body: fn(&mut Self, &T) -> T,
    ) -> T
    where
        T: LetNode,
    {
        let value = self.mutate_expr(value);
        let shadow = shadow_name(name);
        let new_body;
        if is_native_interleave(&value) {
            // A deinterleaved version of this value is available to the
            // body on demand.
            self.vars.push(shadow.clone(), true);
            new_body = mutate_body(self, body);
            self.vars.pop(&shadow);
        } else {
            new_body = mutate_body(self, body);
        }
        if new_body == *body {
            // The body did not change, so it cannot reference the shadow.
            return T::make_let(name.to_string(), value, new_body);
        }
        let shadow_used = new_body.uses_var(&shadow);
        let original_used = new_body.uses_var(name);
        if shadow_used && original_used {
            // Both layouts are needed. Bind the deinterleaved value once
            // and re-materialize the interleaved one from it, so each is
            // computed exactly once.
            let deinterleaved = self.remove_interleave(&value);
            let shadow_var = Expr::var(shadow.clone(), deinterleaved.ty());
            let inner = T::make_let(name.to_string(), native_interleave(shadow_var), new_body);
            T::make_let(shadow, deinterleaved, inner)
        } else if shadow_used {
            // Only the deinterleaved layout is needed; the marker on the
            // value cancels entirely.
            T::make_let(shadow, self.remove_interleave(&value), new_body)
        } else if original_used {
            T::make_let(name.to_string(), value, new_body)
        } else {
            internal_assert!(
                !body.uses_var(name),
                "dropped let of {} which the body references",
                name
            );
            new_body
        }
    }

    /// Whether a marker on every operand may move to the call's result.
    fn is_interleavable(&self, name: &str, result: &Expr, args: &[Expr]) -> bool {
        if INTERLEAVABLE_INTRINSICS.contains(name) {
            return true;
        }
        if NON_TRANSPARENT_INTRINSICS.contains(name) {
            return false;
        }
        if name.starts_with("vpu.") {
            // Assumed transparent when every vector operand has the
            // result's width and lane count; anything that breaks this
            // assumption belongs in the exclusion list above.
            let rt = result.ty();
            for arg in args {
                let at = arg.ty();
                if at.is_scalar() {
                    continue;
                }
                if at.bits != rt.bits || at.lanes != rt.lanes {
                    return false;
                }
            }
        }
        true
    }

    fn visit_call(&mut self, e: &Expr) -> Expr {
        let Expr::Call {
            ty,
            name,
            class,
            args,
        } = e
        else {
            internal_error!("visit_call on non-call '{}'", e);
        };
        let args: Vec<Expr> = args.iter().map(|a| self.mutate_expr(a)).collect();
        let arg_refs: Vec<&Expr> = args.iter().collect();

        if is_native_deinterleave(e) && self.yields_interleave(&args[0]) {
            // A deinterleave of an interleave: both cancel.
            self.remove_interleave(&args[0])
        } else if self.is_interleavable(name, e, &args)
            && self.yields_removable_interleave(&arg_refs)
        {
            let args = args.iter().map(|a| self.remove_interleave(a)).collect();
            native_interleave(Expr::call(*ty, name.clone(), *class, args))
        } else if let Some(alt) = deinterleaving_alt(name) {
            if self.yields_removable_interleave(&arg_refs) {
                // The self-interleaving dual of this narrowing intrinsic
                // absorbs the operand markers for free.
                let mut args: Vec<Expr> =
                    args.iter().map(|a| self.remove_interleave(a)).collect();
                for &v in alt.extra_args {
                    args.push(Expr::int(v, Type::int(32)));
                }
                Expr::call(*ty, alt.name, *class, args)
            } else {
                Expr::call(*ty, name.clone(), *class, args)
            }
        } else {
            Expr::call(*ty, name.clone(), *class, args)
        }
    }
}

impl Default for EliminateInterleaves {
    fn default() -> Self {
        EliminateInterleaves::new()
    }
}

impl Pass for EliminateInterleaves {
    fn name(&self) -> &'static str {
        "eliminate-interleaves"
    }

    fn run(&mut self, body: &Stmt) -> Stmt {
        self.mutate_stmt(body)
    }
}

impl Mutator for EliminateInterleaves {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e {
            Expr::Binary { op, a, b } => {
                let a = self.mutate_expr(a);
                let b = self.mutate_expr(b);
                if self.yields_removable_interleave(&[&a, &b]) {
                    let a = self.remove_interleave(&a);
                    let b = self.remove_interleave(&b);
                    native_interleave(Expr::binary(*op, a, b))
                } else {
                    Expr::binary(*op, a, b)
                }
            }
            Expr::Not { a } => {
                let a = self.mutate_expr(a);
                if is_native_interleave(&a) {
                    native_interleave(Expr::not(self.remove_interleave(&a)))
                } else {
                    Expr::not(a)
                }
            }
            Expr::Select {
                cond,
                true_value,
                false_value,
            } => {
                let cond = self.mutate_expr(cond);
                let t = self.mutate_expr(true_value);
                let f = self.mutate_expr(false_value);
                if self.yields_removable_interleave(&[&cond, &t, &f]) {
                    native_interleave(Expr::select(
                        self.remove_interleave(&cond),
                        self.remove_interleave(&t),
                        self.remove_interleave(&f),
                    ))
                } else {
                    Expr::select(cond, t, f)
                }
            }
            Expr::Let { name, value, body } => {
                self.visit_let(name, value, body, Self::mutate_expr)
            }
            Expr::Cast { ty, value } if ty.bits == value.ty().bits => {
                // A permutation is orthogonal to a same-width
                // reinterpretation, so the marker moves through.
                let value = self.mutate_expr(value);
                if is_native_interleave(&value) {
                    native_interleave(Expr::cast(*ty, self.remove_interleave(&value)))
                } else {
                    Expr::cast(*ty, value)
                }
            }
            Expr::Call { .. } => self.visit_call(e),
            _ => mutate_children(self, e),
        }
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        match s {
            Stmt::LetStmt { name, value, body } => {
                self.visit_let(name, value, body, Self::mutate_stmt)
            }
            _ => mutate_stmt_children(self, s),
        }
    }
}
