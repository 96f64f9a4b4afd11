//! The consumed common-subexpression eliminator.
//!
//! Works on pure scalar expressions (index arithmetic): every structurally
//! identical subtree that occurs more than once is hoisted into a let
//! binding, children before parents, so later analyses see each distinct
//! computation once.

use rustc_hash::FxHashMap;

use crate::ir::expr::{expr_uses_var, Expr};

/// True for subtrees worth naming. Leaves and broadcasts of constants are
/// cheaper to repeat than to bind.
fn should_extract(e: &Expr) -> bool {
    !matches!(
        e,
        Expr::IntImm { .. } | Expr::Var { .. } | Expr::Broadcast { .. }
    )
}

fn count_subtrees(e: &Expr, counts: &mut FxHashMap<Expr, usize>, order: &mut Vec<Expr>) {
    match e {
        Expr::IntImm { .. } | Expr::Var { .. } => return,
        Expr::Cast { value, .. } => count_subtrees(value, counts, order),
        Expr::Binary { a, b, .. } => {
            count_subtrees(a, counts, order);
            count_subtrees(b, counts, order);
        }
        Expr::Not { a } => count_subtrees(a, counts, order),
        Expr::Select {
            cond,
            true_value,
            false_value,
        } => {
            count_subtrees(cond, counts, order);
            count_subtrees(true_value, counts, order);
            count_subtrees(false_value, counts, order);
        }
        Expr::Let { value, body, .. } => {
            count_subtrees(value, counts, order);
            count_subtrees(body, counts, order);
        }
        Expr::Load { index, .. } => count_subtrees(index, counts, order),
        Expr::Broadcast { value, .. } => count_subtrees(value, counts, order),
        Expr::Ramp { base, stride, .. } => {
            count_subtrees(base, counts, order);
            count_subtrees(stride, counts, order);
        }
        Expr::Call { args, .. } => {
            for a in args {
                count_subtrees(a, counts, order);
            }
        }
    }
    if should_extract(e) {
        let n = counts.entry(e.clone()).or_insert(0);
        *n += 1;
        if *n == 1 {
            // Postorder position of the first occurrence: children are
            // recorded before their parents.
            order.push(e.clone());
        }
    }
}

/// Replaces every subtree present in `map` with its binding variable,
/// outermost occurrences first.
fn replace_all(e: &Expr, map: &FxHashMap<Expr, Expr>) -> Expr {
    if let Some(var) = map.get(e) {
        return var.clone();
    }
    match e {
        Expr::IntImm { .. } | Expr::Var { .. } => e.clone(),
        Expr::Cast { ty, value } => Expr::cast(*ty, replace_all(value, map)),
        Expr::Binary { op, a, b } => Expr::Binary {
            op: *op,
            a: Box::new(replace_all(a, map)),
            b: Box::new(replace_all(b, map)),
        },
        Expr::Not { a } => Expr::not(replace_all(a, map)),
        Expr::Select {
            cond,
            true_value,
            false_value,
        } => Expr::select(
            replace_all(cond, map),
            replace_all(true_value, map),
            replace_all(false_value, map),
        ),
        Expr::Let { name, value, body } => Expr::let_in(
            name.clone(),
            replace_all(value, map),
            replace_all(body, map),
        ),
        Expr::Load { ty, name, index } => {
            Expr::load(*ty, name.clone(), replace_all(index, map))
        }
        Expr::Broadcast { value, lanes } => Expr::broadcast(replace_all(value, map), *lanes),
        Expr::Ramp {
            base,
            stride,
            lanes,
        } => Expr::ramp(
            replace_all(base, map),
            replace_all(stride, map),
            *lanes,
        ),
        Expr::Call {
            ty,
            name,
            class,
            args,
        } => Expr::call(
            *ty,
            name.clone(),
            *class,
            args.iter().map(|a| replace_all(a, map)).collect(),
        ),
    }
}

/// Hoists repeated subtrees of `e` into let bindings.
pub fn common_subexpression_elimination(e: &Expr) -> Expr {
    let mut counts: FxHashMap<Expr, usize> = FxHashMap::default();
    let mut order: Vec<Expr> = Vec::new();
    count_subtrees(e, &mut counts, &mut order);

    let mut map: FxHashMap<Expr, Expr> = FxHashMap::default();
    // (name, definition) in binding order, outermost first.
    let mut bindings: Vec<(String, Expr)> = Vec::new();
    let mut next_id = 0usize;
    for candidate in order {
        if counts[&candidate] < 2 {
            continue;
        }
        // Pick a fresh name not free in the input.
        let name = loop {
            let name = format!("t{}", next_id);
            next_id += 1;
            if !expr_uses_var(e, &name) {
                break name;
            }
        };
        // Children were processed first, so their vars appear in this
        // definition already.
        let def = replace_all(&candidate, &map);
        map.insert(candidate.clone(), Expr::var(name.clone(), candidate.ty()));
        bindings.push((name, def));
    }

    let mut out = replace_all(e, &map);
    for (name, def) in bindings.into_iter().rev() {
        out = Expr::let_in(name, def, out);
    }
    out
}
