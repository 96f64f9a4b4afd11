//! Reference evaluator for expression trees.
//!
//! Evaluates an expression over a valuation of its free variables and
//! buffers, including every VPU intrinsic the optimizer emits. Its job is
//! to pin down the value semantics the rewrites must preserve: the
//! soundness tests evaluate a tree before and after optimization and
//! require identical results lane for lane.
//!
//! Layout markers evaluate as real permutations. A deinterleave splits a
//! vector into its even lanes followed by its odd lanes; an interleave is
//! the inverse permutation. An intrinsic whose selection deinterleaved an
//! operand or interleaved its result is defined here with those
//! permutations composed in, which is what makes marker cancellation an
//! identity on values rather than a convention.

use rustc_hash::FxHashMap;

use crate::analysis::{div_floor, mod_floor, wrap_to_type};
use crate::error::EvalError;
use crate::internal_assert;
use crate::ir::expr::{BinOp, Expr};
use crate::ir::types::Type;

/// An evaluated value: one `i64` per lane, normalized to the range of
/// the element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub ty: Type,
    pub lanes: Vec<i64>,
}

impl Value {
    pub fn new(ty: Type, lanes: Vec<i64>) -> Value {
        internal_assert!(
            lanes.len() == ty.lanes as usize,
            "value of type {} with {} lanes",
            ty,
            lanes.len()
        );
        Value { ty, lanes }
    }

    pub fn scalar(ty: Type, v: i64) -> Value {
        Value::new(ty.element_of(), vec![wrap_to_type(v, ty)])
    }

    /// The lane value at `i`, with scalars broadcast to every lane.
    fn lane(&self, i: usize) -> i64 {
        if self.lanes.len() == 1 {
            self.lanes[0]
        } else {
            self.lanes[i]
        }
    }
}

/// A valuation: free variables and load buffers.
#[derive(Debug, Default)]
pub struct Env {
    vars: FxHashMap<String, Value>,
    buffers: FxHashMap<String, Vec<i64>>,
}

impl Env {
    pub fn new() -> Env {
        Env::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn bind_buffer(&mut self, name: impl Into<String>, data: Vec<i64>) {
        self.buffers.insert(name.into(), data);
    }
}

/// Even lanes first, then odd lanes.
fn deinterleave_lanes(v: &[i64]) -> Vec<i64> {
    internal_assert!(v.len() % 2 == 0, "permuting {} lanes", v.len());
    let mut out = Vec::with_capacity(v.len());
    out.extend(v.iter().step_by(2));
    out.extend(v.iter().skip(1).step_by(2));
    out
}

/// The inverse of [`deinterleave_lanes`].
fn interleave_lanes(v: &[i64]) -> Vec<i64> {
    internal_assert!(v.len() % 2 == 0, "permuting {} lanes", v.len());
    let half = v.len() / 2;
    let mut out = Vec::with_capacity(v.len());
    for i in 0..half {
        out.push(v[i]);
        out.push(v[half + i]);
    }
    out
}

/// Leading zero count of `v` seen as an unsigned `bits`-wide value.
fn clz(v: i64, bits: u32) -> i64 {
    let mask = if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    let u = (v as u64) & mask;
    let bit_length = 64 - u.leading_zeros() as i64;
    bits as i64 - bit_length
}

fn checked_shift(v: i64, amount: i64, left: bool, lane: usize) -> Result<i64, EvalError> {
    if !(0..64).contains(&amount) {
        return Err(EvalError::ShiftOutOfRange { amount, lane });
    }
    Ok(if left {
        v.wrapping_shl(amount as u32)
    } else {
        v >> amount
    })
}

/// Evaluates `e` under `env`. Fails only on ill-formed valuations, never
/// on the shape of the tree the optimizer produced.
pub fn eval(e: &Expr, env: &mut Env) -> Result<Value, EvalError> {
    let ty = e.ty();
    if ty.element_of().is_float() {
        return Err(EvalError::FloatUnsupported);
    }
    match e {
        Expr::IntImm { value, ty } => Ok(Value::scalar(*ty, *value)),
        Expr::Var { name, .. } => match env.vars.get(name) {
            Some(v) => Ok(v.clone()),
            None => Err(EvalError::UnboundVariable { name: name.clone() }),
        },
        Expr::Cast { ty, value } => {
            let v = eval(value, env)?;
            let elem = ty.element_of();
            let lanes = v.lanes.iter().map(|&x| wrap_to_type(x, elem)).collect();
            Ok(Value::new(*ty, lanes))
        }
        Expr::Binary { op, a, b } => {
            let va = eval(a, env)?;
            let vb = eval(b, env)?;
            eval_binary(*op, ty, &va, &vb)
        }
        Expr::Not { a } => {
            let v = eval(a, env)?;
            let lanes = v.lanes.iter().map(|&x| (x == 0) as i64).collect();
            Ok(Value::new(v.ty, lanes))
        }
        Expr::Select {
            cond,
            true_value,
            false_value,
        } => {
            let c = eval(cond, env)?;
            let t = eval(true_value, env)?;
            let f = eval(false_value, env)?;
            let lanes = (0..ty.lanes as usize)
                .map(|i| if c.lane(i) != 0 { t.lane(i) } else { f.lane(i) })
                .collect();
            Ok(Value::new(ty, lanes))
        }
        Expr::Let { name, value, body } => {
            let v = eval(value, env)?;
            let saved = env.vars.insert(name.clone(), v);
            let out = eval(body, env);
            match saved {
                Some(old) => {
                    env.vars.insert(name.clone(), old);
                }
                None => {
                    env.vars.remove(name);
                }
            }
            out
        }
        Expr::Load { ty, name, index } => {
            let idx = eval(index, env)?;
            let data = env
                .buffers
                .get(name)
                .ok_or_else(|| EvalError::UnboundBuffer { name: name.clone() })?;
            let elem = ty.element_of();
            let mut lanes = Vec::with_capacity(ty.lanes as usize);
            for i in 0..ty.lanes as usize {
                let at = idx.lane(i);
                let v = usize::try_from(at)
                    .ok()
                    .and_then(|at| data.get(at))
                    .ok_or_else(|| EvalError::LoadOutOfBounds {
                        name: name.clone(),
                        index: at,
                        len: data.len(),
                    })?;
                lanes.push(wrap_to_type(*v, elem));
            }
            Ok(Value::new(*ty, lanes))
        }
        Expr::Broadcast { value, lanes } => {
            let v = eval(value, env)?;
            Ok(Value::new(ty, vec![v.lanes[0]; *lanes as usize]))
        }
        Expr::Ramp {
            base,
            stride,
            lanes,
        } => {
            let b = eval(base, env)?;
            let s = eval(stride, env)?;
            let elem = ty.element_of();
            let out = (0..*lanes as i64)
                .map(|i| wrap_to_type(b.lanes[0].wrapping_add(s.lanes[0].wrapping_mul(i)), elem))
                .collect();
            Ok(Value::new(ty, out))
        }
        Expr::Call { ty, name, args, .. } => {
            let mut vals = Vec::with_capacity(args.len());
            for a in args {
                vals.push(eval(a, env)?);
            }
            eval_call(*ty, name, &vals)
        }
    }
}

fn eval_binary(op: BinOp, ty: Type, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let elem = ty.element_of();
    let mut lanes = Vec::with_capacity(ty.lanes as usize);
    for i in 0..ty.lanes as usize {
        let (x, y) = (a.lane(i), b.lane(i));
        let v = match op {
            BinOp::Add => wrap_to_type(x.wrapping_add(y), elem),
            BinOp::Sub => wrap_to_type(x.wrapping_sub(y), elem),
            BinOp::Mul => wrap_to_type(x.wrapping_mul(y), elem),
            BinOp::Div => {
                if y == 0 {
                    return Err(EvalError::DivisionByZero { lane: i });
                }
                wrap_to_type(div_floor(x, y), elem)
            }
            BinOp::Mod => {
                if y == 0 {
                    return Err(EvalError::DivisionByZero { lane: i });
                }
                wrap_to_type(mod_floor(x, y), elem)
            }
            BinOp::Min => x.min(y),
            BinOp::Max => x.max(y),
            BinOp::Eq => (x == y) as i64,
            BinOp::Ne => (x != y) as i64,
            BinOp::Lt => (x < y) as i64,
            BinOp::Le => (x <= y) as i64,
            BinOp::Gt => (x > y) as i64,
            BinOp::Ge => (x >= y) as i64,
            BinOp::And => (x != 0 && y != 0) as i64,
            BinOp::Or => (x != 0 || y != 0) as i64,
        };
        lanes.push(v);
    }
    Ok(Value::new(ty, lanes))
}

fn expect_arity(name: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::WrongArity {
            name: name.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn eval_call(ty: Type, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    if let Some(rest) = name.strip_prefix("vpu.") {
        let base = rest.split('.').next().unwrap_or(rest);
        return eval_vpu(ty, name, base, args);
    }
    let elem = ty.element_of();
    let n = ty.lanes as usize;
    match name {
        "bitwise_and" | "bitwise_or" | "bitwise_xor" | "absd" => {
            expect_arity(name, args, 2)?;
            let f = |x: i64, y: i64| match name {
                "bitwise_and" => x & y,
                "bitwise_or" => x | y,
                "bitwise_xor" => x ^ y,
                _ => (x - y).abs(),
            };
            let lanes = (0..n)
                .map(|i| wrap_to_type(f(args[0].lane(i), args[1].lane(i)), elem))
                .collect();
            Ok(Value::new(ty, lanes))
        }
        "bitwise_not" => {
            expect_arity(name, args, 1)?;
            let lanes = (0..n)
                .map(|i| wrap_to_type(!args[0].lane(i), elem))
                .collect();
            Ok(Value::new(ty, lanes))
        }
        "abs" => {
            expect_arity(name, args, 1)?;
            let lanes = (0..n)
                .map(|i| wrap_to_type(args[0].lane(i).abs(), elem))
                .collect();
            Ok(Value::new(ty, lanes))
        }
        "count_leading_zeros" => {
            expect_arity(name, args, 1)?;
            let bits = args[0].ty.bits;
            let lanes = (0..n).map(|i| clz(args[0].lane(i), bits)).collect();
            Ok(Value::new(ty, lanes))
        }
        "shift_left" | "shift_right" => {
            expect_arity(name, args, 2)?;
            let left = name == "shift_left";
            let mut lanes = Vec::with_capacity(n);
            for i in 0..n {
                let v = checked_shift(args[0].lane(i), args[1].lane(i), left, i)?;
                lanes.push(wrap_to_type(v, elem));
            }
            Ok(Value::new(ty, lanes))
        }
        "dynamic_shuffle" => {
            expect_arity(name, args, 4)?;
            let (table, index, pad, len) = (&args[0], &args[1], &args[2], &args[3]);
            let len = (len.lanes[0].max(0) as usize).min(table.lanes.len());
            let lanes = (0..n)
                .map(|i| {
                    let at = index.lane(i);
                    match usize::try_from(at) {
                        Ok(at) if at < len => table.lanes[at],
                        _ => pad.lanes[0],
                    }
                })
                .collect();
            Ok(Value::new(ty, lanes))
        }
        _ => Err(EvalError::UnknownIntrinsic {
            name: name.to_string(),
        }),
    }
}

/// Whether an intrinsic's selection interleaved its result and
/// deinterleaved its first operand; evaluation composes the inverse
/// permutations back in.
fn vpu_signature(base: &str) -> (bool, bool) {
    match base {
        "zxt" | "sxt" | "mpy" => (true, false),
        "add_mpy" | "satw_add_mpy" => (true, true),
        "trunc" | "trunclo" | "trunc_shr" | "trunc_satub" | "trunc_sath" | "trunc_satub_shr"
        | "trunc_satuh_shr" | "trunc_sath_shr" | "trunc_satub_rnd" | "trunc_satb_rnd"
        | "trunc_satuh_rnd" | "trunc_sath_rnd" => (false, true),
        _ => (false, false),
    }
}

fn sat(v: i64, elem: Type) -> i64 {
    match (elem.min_value(), elem.max_value()) {
        (Some(lo), Some(hi)) => v.clamp(lo, hi),
        _ => v,
    }
}

fn eval_vpu(ty: Type, name: &str, base: &str, args: &[Value]) -> Result<Value, EvalError> {
    let elem = ty.element_of();
    let n = ty.lanes as usize;

    if base == "interleave" {
        expect_arity(name, args, 1)?;
        return Ok(Value::new(ty, interleave_lanes(&args[0].lanes)));
    }
    if base == "deinterleave" {
        expect_arity(name, args, 1)?;
        return Ok(Value::new(ty, deinterleave_lanes(&args[0].lanes)));
    }

    let (interleave_result, restore_op0) = vpu_signature(base);
    let mut args: Vec<Value> = args.to_vec();
    if restore_op0 {
        // The first operand arrived deinterleaved; undo the permutation
        // so the arithmetic below runs in sequential lane order.
        let lanes = interleave_lanes(&args[0].lanes);
        args[0] = Value::new(args[0].ty, lanes);
    }

    let mut lanes = Vec::with_capacity(n);
    for i in 0..n {
        let v = match base {
            "avg" => {
                expect_arity(name, &args, 2)?;
                div_floor(args[0].lane(i) + args[1].lane(i), 2)
            }
            "avg_rnd" => {
                expect_arity(name, &args, 2)?;
                div_floor(args[0].lane(i) + args[1].lane(i) + 1, 2)
            }
            "navg" => {
                expect_arity(name, &args, 2)?;
                sat(div_floor(args[0].lane(i) - args[1].lane(i), 2), elem)
            }
            "satub_add" | "satuh_add" | "sath_add" | "satw_add" => {
                expect_arity(name, &args, 2)?;
                sat(args[0].lane(i) + args[1].lane(i), elem)
            }
            "satub_sub" | "satuh_sub" | "sath_sub" | "satw_sub" => {
                expect_arity(name, &args, 2)?;
                sat(args[0].lane(i) - args[1].lane(i), elem)
            }
            "trunc_satub_rnd" | "trunc_satb_rnd" => {
                expect_arity(name, &args, 1)?;
                sat(div_floor(args[0].lane(i) + 128, 256), elem)
            }
            "trunc_satuh_rnd" | "trunc_sath_rnd" => {
                expect_arity(name, &args, 1)?;
                sat(div_floor(args[0].lane(i) + 32768, 65536), elem)
            }
            "trunc_satub_shr" | "trunc_satuh_shr" | "trunc_sath_shr" => {
                expect_arity(name, &args, 2)?;
                sat(
                    checked_shift(args[0].lane(i), args[1].lane(i), false, i)?,
                    elem,
                )
            }
            "pack_satub" | "pack_satuh" | "pack_satb" | "pack_sath" | "trunc_satub"
            | "trunc_sath" => {
                expect_arity(name, &args, 1)?;
                sat(args[0].lane(i), elem)
            }
            "trunclo" => {
                expect_arity(name, &args, 1)?;
                let divisor = if args[0].ty.bits == 16 { 256 } else { 65536 };
                wrap_to_type(div_floor(args[0].lane(i), divisor), elem)
            }
            "trunc_shr" => {
                expect_arity(name, &args, 2)?;
                wrap_to_type(
                    checked_shift(args[0].lane(i), args[1].lane(i), false, i)?,
                    elem,
                )
            }
            "pack" | "trunc" => {
                expect_arity(name, &args, 1)?;
                wrap_to_type(args[0].lane(i), elem)
            }
            // Widening is exact; the lane value is unchanged.
            "zxt" | "sxt" => {
                expect_arity(name, &args, 1)?;
                args[0].lane(i)
            }
            "mpy" => {
                expect_arity(name, &args, 2)?;
                wrap_to_type(args[0].lane(i).wrapping_mul(args[1].lane(i)), elem)
            }
            "add_shr" | "add_shl" => {
                expect_arity(name, &args, 3)?;
                let shifted =
                    checked_shift(args[1].lane(i), args[2].lane(i), base == "add_shl", i)?;
                wrap_to_type(args[0].lane(i).wrapping_add(shifted), elem)
            }
            "add_mpy" | "add_mul" => {
                expect_arity(name, &args, 3)?;
                wrap_to_type(
                    args[0]
                        .lane(i)
                        .wrapping_add(args[1].lane(i).wrapping_mul(args[2].lane(i))),
                    elem,
                )
            }
            "satw_add_mpy" => {
                expect_arity(name, &args, 3)?;
                sat(args[0].lane(i) + args[1].lane(i) * args[2].lane(i), elem)
            }
            "cls" => {
                expect_arity(name, &args, 1)?;
                let bits = elem.bits;
                let x = args[0].lane(i);
                clz(x, bits).max(clz(!x, bits)) - 1
            }
            _ => {
                return Err(EvalError::UnknownIntrinsic {
                    name: name.to_string(),
                })
            }
        };
        lanes.push(v);
    }
    if interleave_result {
        lanes = deinterleave_lanes(&lanes);
    }
    Ok(Value::new(ty, lanes))
}
