use thiserror::Error;

/// Runtime errors from the reference evaluator.
///
/// These describe ill-formed inputs to evaluation (missing bindings,
/// out-of-range accesses), never optimizer defects; those halt via the
/// internal assertion macros instead.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unbound variable '{name}' — the valuation does not define it")]
    UnboundVariable { name: String },

    #[error("unbound buffer '{name}' — the environment does not define it")]
    UnboundBuffer { name: String },

    #[error("division by zero in lane {lane}")]
    DivisionByZero { lane: usize },

    #[error("index {index} out of bounds for buffer '{name}' of {len} elements")]
    LoadOutOfBounds {
        name: String,
        index: i64,
        len: usize,
    },

    #[error("unknown intrinsic '{name}'")]
    UnknownIntrinsic { name: String },

    #[error("intrinsic '{name}' expects {expected} arguments, got {got}")]
    WrongArity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("shift amount {amount} out of range in lane {lane}")]
    ShiftOutOfRange { amount: i64, lane: usize },

    #[error("float vectors are not evaluated")]
    FloatUnsupported,
}
