//! Operation registry: operation names, typed overloads, and opcode indices.
//!
//! The registry is the single source of truth shared by the compiler (name →
//! overloads) and the VM (opcode index → behavior). Indices 0..3 are reserved
//! for the typed copies; every other overload is numbered in lexicographic
//! name order, then declaration order, so two registries built from the same
//! definitions always agree on the encoding.

use std::collections::BTreeMap;
use std::collections::HashSet;

use memory::BaseType;
use thiserror::Error;
use tracing::debug;

use crate::opcode::{OpCode, OperandKind};

/// Reserved opcode index of the int copy.
pub const INT_COPY: i64 = 0;
/// Reserved opcode index of the string copy.
pub const STR_COPY: i64 = 1;
/// Reserved opcode index of the bool copy.
pub const BOOL_COPY: i64 = 2;

const RESERVED: [OpCode; 3] = [OpCode::IntCopy, OpCode::StrCopy, OpCode::BoolCopy];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operation `{0}` has no overloads")]
    NoOverloads(String),
    #[error("operation `{0}` is defined twice")]
    DuplicateOperation(String),
    #[error(
        "overloads of `{name}` disagree on arity: {expected_in}->{expected_out} vs {got_in}->{got_out}"
    )]
    ArityMismatch {
        name: String,
        expected_in: usize,
        expected_out: usize,
        got_in: usize,
        got_out: usize,
    },
    #[error("overload of `{name}` does not fit the operand layout of {opcode}")]
    WidthMismatch { name: String, opcode: OpCode },
    #[error("opcode {0} is bound more than once")]
    DuplicateOpcode(OpCode),
}

/// One overload as written in a definition table.
#[derive(Debug, Clone)]
pub struct OverloadDef {
    pub inputs: Vec<BaseType>,
    pub outputs: Vec<BaseType>,
    pub kind: OpCode,
}

#[derive(Debug, Clone)]
pub struct OperationDef {
    pub name: String,
    pub overloads: Vec<OverloadDef>,
}

/// A registered overload, bound to its opcode index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overload {
    pub inputs: Vec<BaseType>,
    pub outputs: Vec<BaseType>,
    pub opcode: i64,
    pub kind: OpCode,
}

impl Overload {
    /// `true` when the instruction carries an inline jump target after its
    /// operands.
    pub fn has_jump_slot(&self) -> bool {
        self.kind.operands().last() == Some(&OperandKind::Target)
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    operations: BTreeMap<String, Vec<Overload>>,
    dispatch: Vec<OpCode>,
}

impl Registry {
    /// Validate `defs` and assign opcode indices.
    pub fn new(defs: Vec<OperationDef>) -> Result<Self, RegistryError> {
        let mut sorted: BTreeMap<String, Vec<OverloadDef>> = BTreeMap::new();
        for def in defs {
            if def.overloads.is_empty() {
                return Err(RegistryError::NoOverloads(def.name));
            }
            if sorted.contains_key(&def.name) {
                return Err(RegistryError::DuplicateOperation(def.name));
            }
            sorted.insert(def.name, def.overloads);
        }

        let mut dispatch = RESERVED.to_vec();
        let mut bound: HashSet<OpCode> = RESERVED.into_iter().collect();
        let mut operations = BTreeMap::new();

        for (name, defs) in sorted {
            let (expected_in, expected_out) = (defs[0].inputs.len(), defs[0].outputs.len());
            let mut overloads = Vec::with_capacity(defs.len());
            for def in defs {
                if def.inputs.len() != expected_in || def.outputs.len() != expected_out {
                    return Err(RegistryError::ArityMismatch {
                        name,
                        expected_in,
                        expected_out,
                        got_in: def.inputs.len(),
                        got_out: def.outputs.len(),
                    });
                }
                if !fits_layout(&def) {
                    return Err(RegistryError::WidthMismatch {
                        name,
                        opcode: def.kind,
                    });
                }
                if !bound.insert(def.kind) {
                    return Err(RegistryError::DuplicateOpcode(def.kind));
                }
                overloads.push(Overload {
                    inputs: def.inputs,
                    outputs: def.outputs,
                    opcode: dispatch.len() as i64,
                    kind: def.kind,
                });
                dispatch.push(def.kind);
            }
            operations.insert(name, overloads);
        }

        debug!(
            operations = operations.len(),
            opcodes = dispatch.len(),
            "registry built"
        );
        Ok(Self {
            operations,
            dispatch,
        })
    }

    /// The fixed builtin operation set.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(builtin_defs())
    }

    pub fn overloads(&self, name: &str) -> Option<&[Overload]> {
        self.operations.get(name).map(Vec::as_slice)
    }

    #[inline]
    pub fn is_operation(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Opcode behind a stream value, if it is a known index.
    #[inline]
    pub fn opcode(&self, raw: i64) -> Option<OpCode> {
        usize::try_from(raw)
            .ok()
            .and_then(|i| self.dispatch.get(i))
            .copied()
    }

    /// Index → behavior table, as consumed by the VM.
    pub fn dispatch_table(&self) -> &[OpCode] {
        &self.dispatch
    }

    pub fn index_of(&self, kind: OpCode) -> Option<i64> {
        self.dispatch
            .iter()
            .position(|&k| k == kind)
            .map(|i| i as i64)
    }

    /// Opcode of the direct copy between two bindings of type `ty`.
    pub fn copy_opcode(ty: BaseType) -> Option<i64> {
        match ty {
            BaseType::Int => Some(INT_COPY),
            BaseType::Str => Some(STR_COPY),
            BaseType::Bool => Some(BOOL_COPY),
            _ => None,
        }
    }
}

fn operand_kind(ty: BaseType) -> Option<OperandKind> {
    match ty {
        BaseType::Int | BaseType::Addr => Some(OperandKind::Int),
        BaseType::Str => Some(OperandKind::Str),
        BaseType::Bool => Some(OperandKind::Bool),
        BaseType::Undecided | BaseType::Any => None,
    }
}

/// An overload fits when its signature, plus the jump slot if the opcode has
/// one, is exactly the opcode's operand layout.
fn fits_layout(def: &OverloadDef) -> bool {
    let layout = def.kind.operands();
    let data = match layout.last() {
        Some(OperandKind::Target) => &layout[..layout.len() - 1],
        _ => layout,
    };
    if data.len() != def.inputs.len() + def.outputs.len() || def.kind.outputs() != def.outputs.len()
    {
        return false;
    }
    def.inputs
        .iter()
        .chain(&def.outputs)
        .zip(data)
        .all(|(ty, kind)| operand_kind(*ty) == Some(*kind))
}

fn builtin_defs() -> Vec<OperationDef> {
    use BaseType::{Addr, Bool, Int, Str};

    macro_rules! op {
        ($name:expr, $( [$($i:ident),*] -> [$($o:ident),*] => $kind:ident ),+ $(,)?) => {
            OperationDef {
                name: $name.to_string(),
                overloads: vec![$(OverloadDef {
                    inputs: vec![$($i),*],
                    outputs: vec![$($o),*],
                    kind: OpCode::$kind,
                }),+],
            }
        };
    }

    vec![
        op!("+", [Int, Int] -> [Int] => Add, [Str, Str] -> [Str] => Concat),
        op!("-", [Int, Int] -> [Int] => Sub),
        op!("*", [Int, Int] -> [Int] => Mul),
        op!("/", [Int, Int] -> [Int] => Div),
        op!("%", [Int, Int] -> [Int] => Mod),
        op!(">", [Int, Int] -> [Bool] => Gt),
        op!("<", [Int, Int] -> [Bool] => Lt),
        op!(">=", [Int, Int] -> [Bool] => Ge),
        op!("<=", [Int, Int] -> [Bool] => Le),
        op!("==", [Int, Int] -> [Bool] => Eq, [Str, Str] -> [Bool] => StrEq),
        op!("!=", [Int, Int] -> [Bool] => NotEq, [Str, Str] -> [Bool] => StrNotEq),
        op!("&&", [Bool, Bool] -> [Bool] => And),
        op!("||", [Bool, Bool] -> [Bool] => Or),
        op!(
            "print",
            [Str] -> [] => PrintStr,
            [Int] -> [] => PrintInt,
            [Bool] -> [] => PrintBool,
        ),
        op!("if", [Bool] -> [] => If),
        op!("goto", [Addr] -> [] => Goto),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, overloads: Vec<OverloadDef>) -> OperationDef {
        OperationDef {
            name: name.to_string(),
            overloads,
        }
    }

    fn ov(inputs: Vec<BaseType>, outputs: Vec<BaseType>, kind: OpCode) -> OverloadDef {
        OverloadDef {
            inputs,
            outputs,
            kind,
        }
    }

    #[test]
    fn test_builtin_builds() {
        let reg = Registry::builtin().unwrap();
        assert_eq!(reg.dispatch_table().len(), OpCode::ALL.len());
        assert_eq!(reg.opcode(INT_COPY), Some(OpCode::IntCopy));
        assert_eq!(reg.opcode(STR_COPY), Some(OpCode::StrCopy));
        assert_eq!(reg.opcode(BOOL_COPY), Some(OpCode::BoolCopy));
        assert_eq!(reg.opcode(-1), None);
        assert_eq!(reg.opcode(10_000), None);
    }

    #[test]
    fn test_indices_follow_name_order() {
        let reg = Registry::builtin().unwrap();
        let names: Vec<&str> = reg.names().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);

        let mut last = BOOL_COPY;
        for name in names {
            for overload in reg.overloads(name).unwrap() {
                assert_eq!(overload.opcode, last + 1, "{name}");
                last = overload.opcode;
            }
        }
        // "!=" sorts first
        assert_eq!(reg.overloads("!=").unwrap()[0].opcode, 3);
    }

    #[test]
    fn test_deterministic_rebuild() {
        let a = Registry::builtin().unwrap();
        let b = Registry::builtin().unwrap();
        assert_eq!(a.dispatch_table(), b.dispatch_table());
    }

    #[test]
    fn test_print_overloads_are_distinct() {
        let reg = Registry::builtin().unwrap();
        let prints = reg.overloads("print").unwrap();
        assert_eq!(prints.len(), 3);
        assert_ne!(prints[0].opcode, prints[1].opcode);
        assert_ne!(prints[1].opcode, prints[2].opcode);
    }

    #[test]
    fn test_if_has_jump_slot() {
        let reg = Registry::builtin().unwrap();
        assert!(reg.overloads("if").unwrap()[0].has_jump_slot());
        assert!(!reg.overloads("goto").unwrap()[0].has_jump_slot());
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let err = Registry::new(vec![def(
            "+",
            vec![
                ov(vec![BaseType::Int, BaseType::Int], vec![BaseType::Int], OpCode::Add),
                ov(vec![BaseType::Str], vec![BaseType::Str], OpCode::Concat),
            ],
        )])
        .unwrap_err();
        assert!(matches!(err, RegistryError::ArityMismatch { .. }));
    }

    #[test]
    fn test_empty_overloads_rejected() {
        let err = Registry::new(vec![def("nop", vec![])]).unwrap_err();
        assert_eq!(err, RegistryError::NoOverloads("nop".into()));
    }

    #[test]
    fn test_layout_mismatch_rejected() {
        let err = Registry::new(vec![def(
            "+",
            vec![ov(vec![BaseType::Str, BaseType::Str], vec![BaseType::Str], OpCode::Add)],
        )])
        .unwrap_err();
        assert!(matches!(err, RegistryError::WidthMismatch { .. }));
    }

    #[test]
    fn test_reserved_opcode_rejected() {
        let err = Registry::new(vec![def(
            "copy",
            vec![ov(vec![BaseType::Int], vec![BaseType::Int], OpCode::IntCopy)],
        )])
        .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateOpcode(OpCode::IntCopy));
    }
}
