use crate::value::{BaseType, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

macro_rules! typed_addr {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl $name {
            /// Interpret a raw stream operand. Negative operands are
            /// unresolved placeholders and never name a slot.
            #[inline]
            pub fn from_raw(raw: i64) -> Option<Self> {
                usize::try_from(raw).ok().map($name)
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0
            }

            #[inline]
            pub fn raw(self) -> i64 {
                self.0 as i64
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

typed_addr!(IntAddr, "i", "Index into [`Program::ints`].");
typed_addr!(StrAddr, "s", "Index into [`Program::strs`].");
typed_addr!(BoolAddr, "b", "Index into [`Program::bools`].");

/// An externally supplied input, declared on the program's parameter line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub position: usize,
    #[serde(rename = "type")]
    pub ty: BaseType,
    pub address: i64,
}

/// A typed location, used for debug symbols and host inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub ty: BaseType,
    pub addr: i64,
}

/// Identifier names of a compiled program. Sidecar data: the program itself
/// never refers to names.
pub type DebugSymbols = BTreeMap<String, Slot>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("expected {expected} input parameter(s), got {got}")]
    Count { expected: usize, got: usize },
    #[error("parameter {position} expects {expected}, got {got}")]
    TypeMismatch {
        position: usize,
        expected: BaseType,
        got: BaseType,
    },
    #[error("parameter {position}: cannot parse {text:?} as {expected}")]
    Unparsable {
        position: usize,
        expected: BaseType,
        text: String,
    },
    #[error("parameter {position} points outside its storage array")]
    OutOfBounds { position: usize },
}

/// The compiled artifact: an interleaved opcode/operand stream plus three
/// typed register files addressed by plain indices.
///
/// Arrays only grow during compilation. At run time the VM overwrites
/// elements in place but never changes their length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub op_addrs: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ints: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bools: Vec<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_int(&mut self, value: i64) -> IntAddr {
        let addr = IntAddr(self.ints.len());
        self.ints.push(value);
        addr
    }

    pub fn alloc_str(&mut self, value: String) -> StrAddr {
        let addr = StrAddr(self.strs.len());
        self.strs.push(value);
        addr
    }

    pub fn alloc_bool(&mut self, value: bool) -> BoolAddr {
        let addr = BoolAddr(self.bools.len());
        self.bools.push(value);
        addr
    }

    /// Append `value` to the array matching its type; returns the raw index.
    pub fn alloc_value(&mut self, value: Value) -> i64 {
        match value {
            Value::Int(n) => self.alloc_int(n).raw(),
            Value::Str(s) => self.alloc_str(s).raw(),
            Value::Bool(b) => self.alloc_bool(b).raw(),
        }
    }

    /// Append the zero value of `ty`. `None` for types without storage.
    pub fn alloc_default(&mut self, ty: BaseType) -> Option<i64> {
        match ty {
            BaseType::Int => Some(self.alloc_int(0).raw()),
            BaseType::Str => Some(self.alloc_str(String::new()).raw()),
            BaseType::Bool => Some(self.alloc_bool(false).raw()),
            _ => None,
        }
    }

    #[inline]
    pub fn int(&self, addr: IntAddr) -> Option<i64> {
        self.ints.get(addr.index()).copied()
    }

    #[inline]
    pub fn str(&self, addr: StrAddr) -> Option<&str> {
        self.strs.get(addr.index()).map(String::as_str)
    }

    #[inline]
    pub fn bool(&self, addr: BoolAddr) -> Option<bool> {
        self.bools.get(addr.index()).copied()
    }

    /// Read the value stored at `slot`, if the slot names real storage.
    pub fn read(&self, slot: Slot) -> Option<Value> {
        match slot.ty {
            BaseType::Int | BaseType::Addr => {
                IntAddr::from_raw(slot.addr).and_then(|a| self.int(a)).map(Value::Int)
            }
            BaseType::Str => StrAddr::from_raw(slot.addr)
                .and_then(|a| self.str(a))
                .map(|s| Value::Str(s.to_string())),
            BaseType::Bool => BoolAddr::from_raw(slot.addr)
                .and_then(|a| self.bool(a))
                .map(Value::Bool),
            BaseType::Undecided | BaseType::Any => None,
        }
    }

    /// Overwrite the value at `slot`. Fails when the slot is out of range or
    /// the value's type differs from the slot's.
    pub fn write(&mut self, slot: Slot, value: Value) -> bool {
        let Ok(index) = usize::try_from(slot.addr) else {
            return false;
        };
        match (slot.ty, value) {
            (BaseType::Int, Value::Int(n)) => self.ints.get_mut(index).map(|v| *v = n).is_some(),
            (BaseType::Str, Value::Str(s)) => self.strs.get_mut(index).map(|v| *v = s).is_some(),
            (BaseType::Bool, Value::Bool(b)) => self.bools.get_mut(index).map(|v| *v = b).is_some(),
            _ => false,
        }
    }

    /// Parse raw argument text according to each parameter's declared type.
    pub fn parse_params<S: AsRef<str>>(&self, raw: &[S]) -> Result<Vec<Value>, ParamError> {
        if raw.len() != self.params.len() {
            return Err(ParamError::Count {
                expected: self.params.len(),
                got: raw.len(),
            });
        }
        self.params
            .iter()
            .zip(raw)
            .map(|(param, text)| {
                Value::parse(param.ty, text.as_ref()).ok_or_else(|| ParamError::Unparsable {
                    position: param.position,
                    expected: param.ty,
                    text: text.as_ref().to_string(),
                })
            })
            .collect()
    }

    /// Store input arguments into the parameter slots, by position.
    pub fn bind_params(&mut self, args: &[Value]) -> Result<(), ParamError> {
        if args.len() != self.params.len() {
            return Err(ParamError::Count {
                expected: self.params.len(),
                got: args.len(),
            });
        }
        let params = self.params.clone();
        for (param, arg) in params.iter().zip(args) {
            if arg.base_type() != param.ty {
                return Err(ParamError::TypeMismatch {
                    position: param.position,
                    expected: param.ty,
                    got: arg.base_type(),
                });
            }
            let slot = Slot {
                ty: param.ty,
                addr: param.address,
            };
            if !self.write(slot, arg.clone()) {
                return Err(ParamError::OutOfBounds {
                    position: param.position,
                });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
