use std::io::Write;

use memory::Program;

use crate::error::RuntimeError;
use crate::opcode::OpCode;

use super::slots::SlotOps;
use super::Step;

/// Trait for arithmetic, comparison and logic instruction handlers
///
/// All of them read two operands and write the third.
pub trait ArithmeticOps {
    fn handle_arithmetic(&mut self, op: OpCode, program: &mut Program)
        -> Result<Step, RuntimeError>;
}

impl<W: Write> ArithmeticOps for super::vm::VM<W> {
    fn handle_arithmetic(
        &mut self,
        op: OpCode,
        program: &mut Program,
    ) -> Result<Step, RuntimeError> {
        match op {
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod => {
                let a = self.int_at(program, 0)?;
                let b = self.int_at(program, 1)?;
                if matches!(op, OpCode::Div | OpCode::Mod) && b == 0 {
                    return Err(RuntimeError::DivisionByZero { pos: self.pos });
                }
                let result = match op {
                    OpCode::Add => a.checked_add(b),
                    OpCode::Sub => a.checked_sub(b),
                    OpCode::Mul => a.checked_mul(b),
                    OpCode::Div => a.checked_div(b),
                    _ => a.checked_rem(b),
                }
                .ok_or(RuntimeError::IntegerOverflow { op, pos: self.pos })?;
                self.set_int(program, 2, result)?;
            }

            OpCode::Concat => {
                let mut joined = self.str_at(program, 0)?.to_string();
                joined.push_str(self.str_at(program, 1)?);
                self.set_str(program, 2, joined)?;
            }

            OpCode::Gt | OpCode::Lt | OpCode::Ge | OpCode::Le | OpCode::Eq | OpCode::NotEq => {
                let a = self.int_at(program, 0)?;
                let b = self.int_at(program, 1)?;
                let result = match op {
                    OpCode::Gt => a > b,
                    OpCode::Lt => a < b,
                    OpCode::Ge => a >= b,
                    OpCode::Le => a <= b,
                    OpCode::Eq => a == b,
                    _ => a != b,
                };
                self.set_bool(program, 2, result)?;
            }

            OpCode::StrEq | OpCode::StrNotEq => {
                let equal = self.str_at(program, 0)? == self.str_at(program, 1)?;
                self.set_bool(program, 2, equal == (op == OpCode::StrEq))?;
            }

            OpCode::And | OpCode::Or => {
                let a = self.bool_at(program, 0)?;
                let b = self.bool_at(program, 1)?;
                let result = if op == OpCode::And { a && b } else { a || b };
                self.set_bool(program, 2, result)?;
            }

            _ => unreachable!(),
        }
        Ok(Step::Next)
    }
}
