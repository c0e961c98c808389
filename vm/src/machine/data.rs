use std::io::Write;

use memory::Program;

use crate::error::RuntimeError;
use crate::opcode::OpCode;

use super::slots::SlotOps;
use super::Step;

/// Trait for copy and print instruction handlers
pub trait DataOps {
    fn handle_data(&mut self, op: OpCode, program: &mut Program) -> Result<Step, RuntimeError>;
}

impl<W: Write> DataOps for super::vm::VM<W> {
    fn handle_data(&mut self, op: OpCode, program: &mut Program) -> Result<Step, RuntimeError> {
        match op {
            OpCode::IntCopy => {
                let value = self.int_at(program, 0)?;
                self.set_int(program, 1, value)?;
            }
            OpCode::StrCopy => {
                let value = self.str_at(program, 0)?.to_string();
                self.set_str(program, 1, value)?;
            }
            OpCode::BoolCopy => {
                let value = self.bool_at(program, 0)?;
                self.set_bool(program, 1, value)?;
            }

            OpCode::PrintStr => {
                let value = self.str_at(program, 0)?;
                writeln!(self.out, "{}", value)?;
            }
            OpCode::PrintInt => {
                let value = self.int_at(program, 0)?;
                writeln!(self.out, "{}", value)?;
            }
            OpCode::PrintBool => {
                let value = self.bool_at(program, 0)?;
                writeln!(self.out, "{}", value)?;
            }

            _ => unreachable!(),
        }
        Ok(Step::Next)
    }
}
