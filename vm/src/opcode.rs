//! OpCode definitions for the Rill VM
//!
//! Programs are a flat `i64` stream. An instruction is its opcode index
//! followed by a fixed number of operands:
//!
//! Copy:     [op][src][dst]
//! Binary:   [op][lhs][rhs][dst]
//! Print:    [op][src]
//! If:       [op][cond][target]
//! Goto:     [op][label slot]
//!
//! Operands are indices into one of the three typed arrays, except for the
//! `if` target which is an absolute stream offset. Opcode indices are
//! assigned by the [`Registry`](crate::registry::Registry); this enum is the
//! closed set of behaviors the VM knows how to execute.

use std::fmt;

/// What an operand slot refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Index into `Program::ints`
    Int,
    /// Index into `Program::strs`
    Str,
    /// Index into `Program::bools`
    Bool,
    /// Absolute offset into `Program::op_addrs`
    Target,
}

/// Virtual machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // ===== Moves =====
    /// ints[dst] = ints[src]
    IntCopy,
    /// strs[dst] = strs[src]
    StrCopy,
    /// bools[dst] = bools[src]
    BoolCopy,

    // ===== Arithmetic =====
    Add,
    Sub,
    Mul,
    /// Truncating division
    Div,
    /// Remainder with the sign of the dividend
    Mod,
    /// String concatenation
    Concat,

    // ===== Comparison =====
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    NotEq,
    StrEq,
    StrNotEq,

    // ===== Logic =====
    And,
    Or,

    // ===== Output =====
    PrintStr,
    PrintInt,
    PrintBool,

    // ===== Flow Control =====
    /// If !bools[cond] then pos = target
    If,
    /// pos = ints[slot]
    Goto,
}

impl OpCode {
    pub const ALL: [OpCode; 24] = [
        OpCode::IntCopy,
        OpCode::StrCopy,
        OpCode::BoolCopy,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Mod,
        OpCode::Concat,
        OpCode::Gt,
        OpCode::Lt,
        OpCode::Ge,
        OpCode::Le,
        OpCode::Eq,
        OpCode::NotEq,
        OpCode::StrEq,
        OpCode::StrNotEq,
        OpCode::And,
        OpCode::Or,
        OpCode::PrintStr,
        OpCode::PrintInt,
        OpCode::PrintBool,
        OpCode::If,
        OpCode::Goto,
    ];

    /// Operand layout, in stream order.
    pub fn operands(self) -> &'static [OperandKind] {
        use OperandKind::*;
        match self {
            OpCode::IntCopy => &[Int, Int],
            OpCode::StrCopy => &[Str, Str],
            OpCode::BoolCopy => &[Bool, Bool],
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod => {
                &[Int, Int, Int]
            }
            OpCode::Concat => &[Str, Str, Str],
            OpCode::Gt | OpCode::Lt | OpCode::Ge | OpCode::Le | OpCode::Eq | OpCode::NotEq => {
                &[Int, Int, Bool]
            }
            OpCode::StrEq | OpCode::StrNotEq => &[Str, Str, Bool],
            OpCode::And | OpCode::Or => &[Bool, Bool, Bool],
            OpCode::PrintStr => &[Str],
            OpCode::PrintInt => &[Int],
            OpCode::PrintBool => &[Bool],
            OpCode::If => &[Bool, Target],
            OpCode::Goto => &[Int],
        }
    }

    /// Number of trailing operands that are written.
    pub fn outputs(self) -> usize {
        match self {
            OpCode::PrintStr | OpCode::PrintInt | OpCode::PrintBool | OpCode::If | OpCode::Goto => 0,
            _ => 1,
        }
    }

    /// Instruction width in stream slots, opcode included.
    #[inline]
    pub fn width(self) -> usize {
        1 + self.operands().len()
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            OpCode::IntCopy => "INT_COPY",
            OpCode::StrCopy => "STR_COPY",
            OpCode::BoolCopy => "BOOL_COPY",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Concat => "CONCAT",
            OpCode::Gt => "GT",
            OpCode::Lt => "LT",
            OpCode::Ge => "GE",
            OpCode::Le => "LE",
            OpCode::Eq => "EQ",
            OpCode::NotEq => "NOT_EQ",
            OpCode::StrEq => "STR_EQ",
            OpCode::StrNotEq => "STR_NOT_EQ",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::PrintStr => "PRINT_STR",
            OpCode::PrintInt => "PRINT_INT",
            OpCode::PrintBool => "PRINT_BOOL",
            OpCode::If => "IF",
            OpCode::Goto => "GOTO",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
