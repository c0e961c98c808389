use std::io::{self, Write};

use memory::Program;
use tracing::{debug, trace};

use crate::error::RuntimeError;
use crate::opcode::OpCode;
use crate::registry::Registry;

use super::arithmetic::ArithmeticOps;
use super::control::ControlFlowOps;
use super::data::DataOps;
use super::Step;

/// The Virtual Machine struct
///
/// Holds only the dispatch table and the program counter; all data lives in
/// the [`Program`] passed to [`VM::interpret`]. `print` output goes to `W`
/// (stderr unless a sink is injected).
pub struct VM<W: Write = io::Stderr> {
    pub(super) dispatch: Vec<OpCode>,
    /// Stream offset of the instruction being executed
    pub(super) pos: usize,
    steps: u64,
    pub(super) out: W,
}

impl VM<io::Stderr> {
    pub fn new(registry: &Registry) -> Self {
        Self::with_output(registry, io::stderr())
    }
}

impl<W: Write> VM<W> {
    pub fn with_output(registry: &Registry, out: W) -> Self {
        Self {
            dispatch: registry.dispatch_table().to_vec(),
            pos: 0,
            steps: 0,
            out,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Instructions executed by the last call to [`VM::interpret`].
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Main interpretation loop
    ///
    /// Runs from offset 0 until the program counter reaches the end of the
    /// stream. Every operand is bounds-checked; malformed bytecode surfaces as
    /// a [`RuntimeError`], never a panic. On error, array writes made by
    /// earlier instructions stay in place.
    pub fn interpret(&mut self, program: &mut Program) -> Result<(), RuntimeError> {
        self.pos = 0;
        self.steps = 0;
        let len = program.op_addrs.len();
        debug!(words = len, "program started");

        while self.pos < len {
            let pos = self.pos;
            let raw = program.op_addrs[pos];
            let op = usize::try_from(raw)
                .ok()
                .and_then(|i| self.dispatch.get(i))
                .copied()
                .ok_or(RuntimeError::InvalidOpcode { opcode: raw, pos })?;

            if pos + op.width() > len {
                return Err(RuntimeError::TruncatedInstruction { op, pos });
            }
            trace!(pos, op = %op, "exec");

            let step = match op {
                OpCode::IntCopy
                | OpCode::StrCopy
                | OpCode::BoolCopy
                | OpCode::PrintStr
                | OpCode::PrintInt
                | OpCode::PrintBool => self.handle_data(op, program)?,

                OpCode::If | OpCode::Goto => self.handle_control(op, program)?,

                _ => self.handle_arithmetic(op, program)?,
            };

            self.steps += 1;
            match step {
                Step::Next => self.pos += op.width(),
                Step::Jump(target) => self.pos = target,
            }
        }

        self.out.flush()?;
        debug!(steps = self.steps, "program finished");
        Ok(())
    }
}
