use std::io::Write;

use memory::{BoolAddr, IntAddr, Program, StrAddr};

use crate::error::{Array, RuntimeError};

/// Bounds-checked operand access for the current instruction.
///
/// `k` is the operand index, 0 being the slot right after the opcode. The
/// dispatch loop has already checked that the whole instruction fits in the
/// stream.
pub trait SlotOps {
    fn operand(&self, program: &Program, k: usize) -> i64;

    fn int_at(&self, program: &Program, k: usize) -> Result<i64, RuntimeError>;
    fn str_at<'p>(&self, program: &'p Program, k: usize) -> Result<&'p str, RuntimeError>;
    fn bool_at(&self, program: &Program, k: usize) -> Result<bool, RuntimeError>;

    fn set_int(&self, program: &mut Program, k: usize, value: i64) -> Result<(), RuntimeError>;
    fn set_str(&self, program: &mut Program, k: usize, value: String)
        -> Result<(), RuntimeError>;
    fn set_bool(&self, program: &mut Program, k: usize, value: bool)
        -> Result<(), RuntimeError>;
}

impl<W: Write> SlotOps for super::vm::VM<W> {
    #[inline]
    fn operand(&self, program: &Program, k: usize) -> i64 {
        program.op_addrs[self.pos + 1 + k]
    }

    fn int_at(&self, program: &Program, k: usize) -> Result<i64, RuntimeError> {
        let addr = self.operand(program, k);
        IntAddr::from_raw(addr)
            .and_then(|a| program.int(a))
            .ok_or(self.out_of_bounds(Array::Ints, addr))
    }

    fn str_at<'p>(&self, program: &'p Program, k: usize) -> Result<&'p str, RuntimeError> {
        let addr = self.operand(program, k);
        StrAddr::from_raw(addr)
            .and_then(|a| program.str(a))
            .ok_or(self.out_of_bounds(Array::Strs, addr))
    }

    fn bool_at(&self, program: &Program, k: usize) -> Result<bool, RuntimeError> {
        let addr = self.operand(program, k);
        BoolAddr::from_raw(addr)
            .and_then(|a| program.bool(a))
            .ok_or(self.out_of_bounds(Array::Bools, addr))
    }

    fn set_int(&self, program: &mut Program, k: usize, value: i64) -> Result<(), RuntimeError> {
        let addr = self.operand(program, k);
        let slot = usize::try_from(addr)
            .ok()
            .and_then(|i| program.ints.get_mut(i))
            .ok_or(self.out_of_bounds(Array::Ints, addr))?;
        *slot = value;
        Ok(())
    }

    fn set_str(
        &self,
        program: &mut Program,
        k: usize,
        value: String,
    ) -> Result<(), RuntimeError> {
        let addr = self.operand(program, k);
        let slot = usize::try_from(addr)
            .ok()
            .and_then(|i| program.strs.get_mut(i))
            .ok_or(self.out_of_bounds(Array::Strs, addr))?;
        *slot = value;
        Ok(())
    }

    fn set_bool(
        &self,
        program: &mut Program,
        k: usize,
        value: bool,
    ) -> Result<(), RuntimeError> {
        let addr = self.operand(program, k);
        let slot = usize::try_from(addr)
            .ok()
            .and_then(|i| program.bools.get_mut(i))
            .ok_or(self.out_of_bounds(Array::Bools, addr))?;
        *slot = value;
        Ok(())
    }
}

impl<W: Write> super::vm::VM<W> {
    fn out_of_bounds(&self, array: Array, addr: i64) -> RuntimeError {
        RuntimeError::OutOfBounds {
            array,
            addr,
            pos: self.pos,
        }
    }
}
