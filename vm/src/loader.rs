//! Program loading: the `.rlb` binary container, the JSON form, and the
//! structural validation both go through before a program reaches the VM.
//!
//! Binary layout (all integers little-endian):
//!
//! ```text
//! magic   "RIL\x01"
//! u32 n   then n × i64       op_addrs
//! u32 n   then n × i64       ints
//! u32 n   then n × (u32 len, utf-8 bytes)  strs
//! u32 n   then n × u8        bools (0 or 1)
//! u32 n   then n × (u32 position, u8 type tag, i64 address)  params
//! ```

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memory::{BaseType, Program};
use thiserror::Error;
use tracing::debug;

use crate::opcode::OperandKind;
use crate::registry::Registry;

pub const MAGIC: &[u8; 4] = b"RIL\x01";

/// Upper bound on any array count read from a binary.
pub const MAX_ARRAY_LEN: u32 = 16_000_000;
/// Upper bound on a single string's byte length.
pub const MAX_STR_LEN: u32 = 1 << 24;

const TAG_INT: u8 = 1;
const TAG_STR: u8 = 2;
const TAG_BOOL: u8 = 3;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("format error: {0}")]
    Format(String),
    #[error("security limit: {0}")]
    Security(String),
    #[error("invalid JSON program: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid program at offset {pos}: {reason}")]
    Invalid { pos: usize, reason: String },
}

pub fn write_program<W: Write>(writer: &mut W, program: &Program) -> Result<(), LoaderError> {
    writer.write_all(MAGIC)?;

    write_count(writer, program.op_addrs.len())?;
    for &word in &program.op_addrs {
        writer.write_i64::<LittleEndian>(word)?;
    }

    write_count(writer, program.ints.len())?;
    for &n in &program.ints {
        writer.write_i64::<LittleEndian>(n)?;
    }

    write_count(writer, program.strs.len())?;
    for s in &program.strs {
        write_count(writer, s.len())?;
        writer.write_all(s.as_bytes())?;
    }

    write_count(writer, program.bools.len())?;
    for &b in &program.bools {
        writer.write_u8(b as u8)?;
    }

    write_count(writer, program.params.len())?;
    for param in &program.params {
        write_count(writer, param.position)?;
        let tag = match param.ty {
            BaseType::Int => TAG_INT,
            BaseType::Str => TAG_STR,
            BaseType::Bool => TAG_BOOL,
            other => {
                return Err(LoaderError::Format(format!(
                    "parameter {} has non-storable type {}",
                    param.position, other
                )))
            }
        };
        writer.write_u8(tag)?;
        writer.write_i64::<LittleEndian>(param.address)?;
    }
    Ok(())
}

fn write_count<W: Write>(writer: &mut W, n: usize) -> Result<(), LoaderError> {
    let n = u32::try_from(n)
        .map_err(|_| LoaderError::Format(format!("count {} does not fit in u32", n)))?;
    writer.write_u32::<LittleEndian>(n)?;
    Ok(())
}

/// Decode a binary program without validating it against a registry.
///
/// # Security
/// Every count is checked against [`MAX_ARRAY_LEN`] / [`MAX_STR_LEN`] before
/// anything is allocated.
pub fn read_program<R: Read>(reader: &mut R) -> Result<Program, LoaderError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(LoaderError::Format(
            "Invalid binary magic or version".to_string(),
        ));
    }

    let mut program = Program::new();

    let n = read_count(reader, "op_addrs")?;
    program.op_addrs.reserve(n);
    for _ in 0..n {
        program.op_addrs.push(reader.read_i64::<LittleEndian>()?);
    }

    let n = read_count(reader, "ints")?;
    program.ints.reserve(n);
    for _ in 0..n {
        program.ints.push(reader.read_i64::<LittleEndian>()?);
    }

    let n = read_count(reader, "strs")?;
    program.strs.reserve(n);
    for _ in 0..n {
        let len = reader.read_u32::<LittleEndian>()?;
        if len > MAX_STR_LEN {
            return Err(LoaderError::Security(format!(
                "String length exceeds limit of {}: {}",
                MAX_STR_LEN, len
            )));
        }
        let mut bytes = vec![0u8; len as usize];
        reader.read_exact(&mut bytes)?;
        let s = String::from_utf8(bytes)
            .map_err(|_| LoaderError::Format("Invalid UTF-8 in binary".to_string()))?;
        program.strs.push(s);
    }

    let n = read_count(reader, "bools")?;
    program.bools.reserve(n);
    for _ in 0..n {
        match reader.read_u8()? {
            0 => program.bools.push(false),
            1 => program.bools.push(true),
            other => {
                return Err(LoaderError::Format(format!("Invalid bool byte: {}", other)))
            }
        }
    }

    let n = read_count(reader, "params")?;
    for _ in 0..n {
        let position = reader.read_u32::<LittleEndian>()? as usize;
        let ty = match reader.read_u8()? {
            TAG_INT => BaseType::Int,
            TAG_STR => BaseType::Str,
            TAG_BOOL => BaseType::Bool,
            tag => return Err(LoaderError::Format(format!("Unknown param tag: {}", tag))),
        };
        let address = reader.read_i64::<LittleEndian>()?;
        program.params.push(memory::Param {
            position,
            ty,
            address,
        });
    }

    let mut trailing = [0u8; 1];
    if reader.read(&mut trailing)? != 0 {
        return Err(LoaderError::Format("Trailing bytes after program".to_string()));
    }
    Ok(program)
}

fn read_count<R: Read>(reader: &mut R, what: &str) -> Result<usize, LoaderError> {
    let n = reader.read_u32::<LittleEndian>()?;
    if n > MAX_ARRAY_LEN {
        return Err(LoaderError::Security(format!(
            "{} count too large: {}",
            what, n
        )));
    }
    Ok(n as usize)
}

/// Read and validate a binary program.
pub fn load_executable<R: Read>(
    reader: &mut R,
    registry: &Registry,
) -> Result<Program, LoaderError> {
    let program = read_program(reader)?;
    validate(&program, registry)?;
    debug!(
        words = program.op_addrs.len(),
        ints = program.ints.len(),
        strs = program.strs.len(),
        bools = program.bools.len(),
        "loaded binary program"
    );
    Ok(program)
}

/// Parse and validate a JSON program.
pub fn load_json(text: &str, registry: &Registry) -> Result<Program, LoaderError> {
    let program = Program::from_json(text)?;
    validate(&program, registry)?;
    Ok(program)
}

/// Structural checks on a program from outside the compiler.
///
/// Every opcode is known, no instruction is truncated, every storage operand
/// is in range of its array, every `if` target lands on an instruction
/// boundary (or the end of the stream), and every parameter names a slot of
/// its declared type. `goto` targets live in the int array and are only
/// checked at run time.
pub fn validate(program: &Program, registry: &Registry) -> Result<(), LoaderError> {
    let code = &program.op_addrs;
    let mut boundaries = vec![false; code.len() + 1];
    let mut targets = Vec::new();
    let mut pos = 0;

    while pos < code.len() {
        boundaries[pos] = true;
        let op = registry.opcode(code[pos]).ok_or_else(|| LoaderError::Invalid {
            pos,
            reason: format!("unknown opcode {}", code[pos]),
        })?;
        if pos + op.width() > code.len() {
            return Err(LoaderError::Invalid {
                pos,
                reason: format!("truncated {} instruction", op),
            });
        }
        for (k, kind) in op.operands().iter().enumerate() {
            let operand = code[pos + 1 + k];
            let len = match kind {
                OperandKind::Int => program.ints.len(),
                OperandKind::Str => program.strs.len(),
                OperandKind::Bool => program.bools.len(),
                OperandKind::Target => {
                    targets.push((pos, operand));
                    continue;
                }
            };
            if usize::try_from(operand).map_or(true, |i| i >= len) {
                return Err(LoaderError::Invalid {
                    pos,
                    reason: format!("{} operand {} out of range", op, operand),
                });
            }
        }
        pos += op.width();
    }
    boundaries[code.len()] = true;

    for (pos, target) in targets {
        let ok = usize::try_from(target)
            .ok()
            .and_then(|t| boundaries.get(t))
            .copied()
            .unwrap_or(false);
        if !ok {
            return Err(LoaderError::Invalid {
                pos,
                reason: format!("jump target {} is not an instruction boundary", target),
            });
        }
    }

    for (i, param) in program.params.iter().enumerate() {
        if param.position != i {
            return Err(LoaderError::Invalid {
                pos: 0,
                reason: format!("parameter {} has position {}", i, param.position),
            });
        }
        let len = match param.ty {
            BaseType::Int => program.ints.len(),
            BaseType::Str => program.strs.len(),
            BaseType::Bool => program.bools.len(),
            other => {
                return Err(LoaderError::Invalid {
                    pos: 0,
                    reason: format!("parameter {} has non-storable type {}", i, other),
                })
            }
        };
        if usize::try_from(param.address).map_or(true, |a| a >= len) {
            return Err(LoaderError::Invalid {
                pos: 0,
                reason: format!("parameter {} address {} out of range", i, param.address),
            });
        }
    }
    Ok(())
}
