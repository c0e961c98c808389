use std::fmt::Write as _;

use memory::Program;

use crate::error::RuntimeError;
use crate::opcode::OperandKind;
use crate::registry::Registry;

/// Render a program as one line per instruction followed by its data arrays.
///
/// Operands carry the prefix of the array they index (`i`, `s`, `b`); `if`
/// targets are printed as `@offset`.
pub fn disassemble(program: &Program, registry: &Registry) -> Result<String, RuntimeError> {
    let code = &program.op_addrs;
    let mut out = String::new();
    let mut pos = 0;

    while pos < code.len() {
        let op = registry
            .opcode(code[pos])
            .ok_or(RuntimeError::InvalidOpcode {
                opcode: code[pos],
                pos,
            })?;
        if pos + op.width() > code.len() {
            return Err(RuntimeError::TruncatedInstruction { op, pos });
        }

        let operands: Vec<String> = op
            .operands()
            .iter()
            .zip(&code[pos + 1..pos + op.width()])
            .map(|(kind, word)| match kind {
                OperandKind::Int => format!("i{}", word),
                OperandKind::Str => format!("s{}", word),
                OperandKind::Bool => format!("b{}", word),
                OperandKind::Target => format!("@{}", word),
            })
            .collect();
        let _ = writeln!(out, "{:04} {:<10} {}", pos, op.name(), operands.join(", "));
        pos += op.width();
    }

    if !program.ints.is_empty() {
        let _ = writeln!(out, "ints:  {:?}", program.ints);
    }
    if !program.strs.is_empty() {
        let _ = writeln!(out, "strs:  {:?}", program.strs);
    }
    if !program.bools.is_empty() {
        let _ = writeln!(out, "bools: {:?}", program.bools);
    }
    for param in &program.params {
        let _ = writeln!(
            out,
            "param {}: {} @ {}",
            param.position, param.ty, param.address
        );
    }
    Ok(out)
}
