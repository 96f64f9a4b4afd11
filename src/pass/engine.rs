//! The table-driven rewrite engine.

use crate::analysis::lossless_cast;
use crate::internal_assert;
use crate::ir::expr::{is_const_power_of_two, Expr};
use crate::ir::matcher::{expr_match, MatchBindings};
use crate::ir::mutate::Mutator;
use crate::ir::types::TypeCode;
use crate::pass::tables::Pattern;
use crate::target::{native_deinterleave, native_interleave, vpu_op};

/// Matches `x` against `patterns` in declaration order and rewrites it to
/// a call of the first pattern that fully applies. Bound operands are
/// recursively processed by `op_mutator` before the call is built, so
/// nested rewrites compose. Returns `x` unchanged when nothing applies.
pub fn apply_patterns(x: &Expr, patterns: &[Pattern], op_mutator: &mut dyn Mutator) -> Expr {
    let mut bindings = MatchBindings::new();
    for p in patterns {
        if !expr_match(&p.template, x, &mut bindings) {
            continue;
        }
        // Narrowing and log2 coercions can fail; failure falls through
        // to the next pattern, never to an error.
        let Some(mut ops) = coerce_operands(p, &bindings) else {
            continue;
        };
        for (i, op) in ops.iter_mut().enumerate() {
            if p.flags.deinterleave.has(i) {
                internal_assert!(
                    op.ty().is_vector(),
                    "deinterleave of scalar operand {} of {}",
                    i,
                    p.intrin
                );
                *op = native_deinterleave(op.clone());
            }
        }
        if p.flags.swap_ops_01 {
            internal_assert!(ops.len() >= 2, "swap 0/1 in {} needs two operands", p.intrin);
            ops.swap(0, 1);
        }
        if p.flags.swap_ops_12 {
            internal_assert!(
                ops.len() >= 3,
                "swap 1/2 in {} needs three operands",
                p.intrin
            );
            ops.swap(1, 2);
        }
        for op in ops.iter_mut() {
            *op = op_mutator.mutate_expr(op);
        }
        let mut result = vpu_op(x.ty(), p.intrin, ops);
        if p.flags.interleave_result {
            result = native_interleave(result);
        }
        return result;
    }
    x.clone()
}

/// Applies the narrow and exact-log2 flags to the bound operands, in
/// operand order. `None` aborts this pattern attempt.
fn coerce_operands(p: &Pattern, bindings: &MatchBindings) -> Option<Vec<Expr>> {
    let mut ops: Vec<Expr> = bindings.iter().cloned().collect();
    for (i, op) in ops.iter_mut().enumerate() {
        let t = op.ty();
        let narrow_t = t.with_bits(t.bits / 2);
        if p.flags.narrow.has(i) {
            *op = lossless_cast(narrow_t, op)?;
        } else if p.flags.narrow_unsigned.has(i) {
            *op = lossless_cast(narrow_t.with_code(TypeCode::UInt), op)?;
        }
    }
    // Shifts hiding in div/mul: the operand must be an exact power of
    // two, and becomes its scalar log base 2.
    for i in 1..ops.len() {
        if p.flags.exact_log2.has(i) {
            let pow = is_const_power_of_two(&ops[i])?;
            ops[i] = Expr::int(pow as i64, ops[i].ty().element_of());
        }
    }
    Some(ops)
}
