use thiserror::Error;

use crate::opcode::OpCode;

/// Which typed array an out-of-range operand pointed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Array {
    Ints,
    Strs,
    Bools,
}

impl std::fmt::Display for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Array::Ints => "ints",
            Array::Strs => "strs",
            Array::Bools => "bools",
        })
    }
}

/// Runtime failure. `pos` is the stream offset of the faulting instruction.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid opcode {opcode} at {pos}")]
    InvalidOpcode { opcode: i64, pos: usize },
    #[error("truncated {op} instruction at {pos}")]
    TruncatedInstruction { op: OpCode, pos: usize },
    #[error("operand {addr} out of bounds for {array} at {pos}")]
    OutOfBounds { array: Array, addr: i64, pos: usize },
    #[error("jump target {target} is outside the program at {pos}")]
    InvalidJump { target: i64, pos: usize },
    #[error("division by zero at {pos}")]
    DivisionByZero { pos: usize },
    #[error("integer overflow in {op} at {pos}")]
    IntegerOverflow { op: OpCode, pos: usize },
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl PartialEq for RuntimeError {
    fn eq(&self, other: &Self) -> bool {
        use RuntimeError::*;
        match (self, other) {
            (InvalidOpcode { opcode: a, pos: p }, InvalidOpcode { opcode: b, pos: q }) => {
                a == b && p == q
            }
            (TruncatedInstruction { op: a, pos: p }, TruncatedInstruction { op: b, pos: q }) => {
                a == b && p == q
            }
            (
                OutOfBounds {
                    array: a,
                    addr: x,
                    pos: p,
                },
                OutOfBounds {
                    array: b,
                    addr: y,
                    pos: q,
                },
            ) => a == b && x == y && p == q,
            (InvalidJump { target: a, pos: p }, InvalidJump { target: b, pos: q }) => {
                a == b && p == q
            }
            (DivisionByZero { pos: p }, DivisionByZero { pos: q }) => p == q,
            (IntegerOverflow { op: a, pos: p }, IntegerOverflow { op: b, pos: q }) => {
                a == b && p == q
            }
            (Output(a), Output(b)) => a.kind() == b.kind(),
            _ => false,
        }
    }
}
