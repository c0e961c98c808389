use std::io::Write;

use memory::Program;

use crate::error::RuntimeError;
use crate::opcode::OpCode;

use super::slots::SlotOps;
use super::Step;

/// Trait for control flow instruction handlers
pub trait ControlFlowOps {
    fn handle_control(&mut self, op: OpCode, program: &mut Program)
        -> Result<Step, RuntimeError>;
}

impl<W: Write> ControlFlowOps for super::vm::VM<W> {
    fn handle_control(
        &mut self,
        op: OpCode,
        program: &mut Program,
    ) -> Result<Step, RuntimeError> {
        match op {
            OpCode::If => {
                if self.bool_at(program, 0)? {
                    return Ok(Step::Next);
                }
                let target = self.operand(program, 1);
                self.jump_to(program, target)
            }
            OpCode::Goto => {
                let target = self.int_at(program, 0)?;
                self.jump_to(program, target)
            }
            _ => unreachable!(),
        }
    }
}

impl<W: Write> super::vm::VM<W> {
    /// A target equal to the stream length ends the program.
    fn jump_to(&self, program: &Program, target: i64) -> Result<Step, RuntimeError> {
        usize::try_from(target)
            .ok()
            .filter(|&t| t <= program.op_addrs.len())
            .map(Step::Jump)
            .ok_or(RuntimeError::InvalidJump {
                target,
                pos: self.pos,
            })
    }
}
