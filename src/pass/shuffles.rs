//! Conversion of bounded indirect vector loads into lookup-table
//! shuffles.
//!
//! An indirect load gathers from arbitrary addresses, which the VPU does
//! slowly through scalar code. When the index provably spans fewer than
//! 256 elements, the whole candidate range fits in registers and the
//! gather becomes one `dynamic_shuffle`.

use crate::analysis::{
    bounds_of_expr_in_scope, common_subexpression_elimination, simplify, Interval,
};
use crate::ir::expr::{as_const_int, is_one, BinOp, CallClass, Expr, Stmt};
use crate::ir::mutate::{mutate_children, mutate_stmt_children, Mutator};
use crate::ir::scope::Scope;
use crate::ir::types::Type;
use crate::pass::Pass;
use crate::target::DYNAMIC_SHUFFLE;

/// Conservatively widens `x` by clearing matched-clamp nonlinearities:
/// `max(x, k) - max(y, k)` has the same upper bound as `x - y`, and
/// likewise for `min`. The plain simplifier cannot remove these, and they
/// are exactly what clamped index spans look like.
struct UpperBound;

impl Mutator for UpperBound {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        if let Expr::Binary {
            op: BinOp::Sub,
            a,
            b,
        } = e
        {
            let a = self.mutate_expr(a);
            let b = self.mutate_expr(b);
            for clamp_op in [BinOp::Min, BinOp::Max] {
                if let (
                    Expr::Binary {
                        op: oa,
                        a: xa,
                        b: ka,
                    },
                    Expr::Binary {
                        op: ob,
                        a: xb,
                        b: kb,
                    },
                ) = (&a, &b)
                {
                    if *oa == clamp_op && *ob == clamp_op && ka == kb {
                        let stripped =
                            Expr::binary(BinOp::Sub, (**xa).clone(), (**xb).clone());
                        return self.mutate_expr(&simplify(&stripped));
                    }
                }
            }
            return Expr::binary(BinOp::Sub, a, b);
        }
        mutate_children(self, e)
    }
}

pub fn upper_bound(e: &Expr) -> Expr {
    simplify(&UpperBound.mutate_expr(e))
}

/// The load-to-shuffle pass.
pub struct OptimizeShuffles {
    bounds: Scope<Interval>,
}

impl OptimizeShuffles {
    pub fn new() -> OptimizeShuffles {
        OptimizeShuffles {
            bounds: Scope::new(),
        }
    }

    /// Proof that the span is below the shuffle's 256 lane table limit.
    /// The comparison is done in 32 bits so narrow span types cannot wrap
    /// the limit itself.
    fn fits_in_table(span: &Expr) -> bool {
        if let Some(c) = as_const_int(span) {
            return (0..256).contains(&c);
        }
        let wide = Expr::cast(Type::int(32), span.clone());
        let limit = Expr::int(256, Type::int(32));
        is_one(&simplify(&Expr::binary(BinOp::Lt, wide, limit)))
    }

    fn visit_load(&mut self, ty: Type, name: &str, index: &Expr) -> Expr {
        let index = self.mutate_expr(index);
        let index_bounds = bounds_of_expr_in_scope(&index, &mut self.bounds);
        let (Some(min), Some(max)) = (index_bounds.min, index_bounds.max) else {
            return Expr::load(ty, name, index);
        };
        let span = Expr::binary(BinOp::Sub, max, min.clone());
        let span = common_subexpression_elimination(&span);
        let span = simplify(&span);
        let span = upper_bound(&span);

        if !Self::fits_in_table(&span) {
            return Expr::load(ty, name, index);
        }
        // A lookup within an up to 256 element table. Load every index
        // the gather could touch, then shuffle. For clamped ramps this
        // reads up to one vector past the maximum; allocation padding
        // downstream accounts for that.
        let const_extent = match as_const_int(&span) {
            Some(c) => c as u32 + 1,
            None => 256,
        };
        let base = simplify(&min);
        let lut = Expr::load(
            ty.with_lanes(const_extent),
            name,
            Expr::ramp(base.clone(), Expr::int(1, base.ty()), const_extent),
        );
        // The table is at most 256 entries, so the offset index fits the
        // 8 bit lanes the shuffle requires.
        let offset = Expr::binary(BinOp::Sub, index, base);
        let index8 = simplify(&Expr::cast(Type::uint(8).with_lanes(ty.lanes), offset));
        Expr::call(
            ty,
            DYNAMIC_SHUFFLE,
            CallClass::Intrinsic,
            vec![
                lut,
                index8,
                Expr::int(0, Type::int(32)),
                Expr::int(const_extent as i64, Type::int(32)),
            ],
        )
    }
}

impl Default for OptimizeShuffles {
    fn default() -> Self {
        OptimizeShuffles::new()
    }
}

impl Pass for OptimizeShuffles {
    fn name(&self) -> &'static str {
        "optimize-shuffles"
    }

    fn run(&mut self, body: &Stmt) -> Stmt {
        self.mutate_stmt(body)
    }
}

impl Mutator for OptimizeShuffles {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e {
            Expr::Let { name, value, .. } if value.ty().is_vector() => {
                let interval = bounds_of_expr_in_scope(value, &mut self.bounds);
                self.bounds.push(name.clone(), interval);
                let out = mutate_children(self, e);
                self.bounds.pop(name);
                out
            }
            Expr::Load { ty, name, index }
                if ty.is_vector() && !matches!(**index, Expr::Ramp { .. }) =>
            {
                self.visit_load(*ty, name, index)
            }
            _ => mutate_children(self, e),
        }
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        match s {
            Stmt::LetStmt { name, value, .. } if value.ty().is_vector() => {
                let interval = bounds_of_expr_in_scope(value, &mut self.bounds);
                self.bounds.push(name.clone(), interval);
                let out = mutate_stmt_children(self, s);
                self.bounds.pop(name);
                out
            }
            _ => mutate_stmt_children(self, s),
        }
    }
}
