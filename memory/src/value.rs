use serde::{Deserialize, Serialize};
use std::fmt;

/// Static type of a binding, an overload slot, or a program parameter.
///
/// Only `Int`, `Str` and `Bool` own storage. `Addr` values live in the
/// integer array (they are stream offsets). `Undecided` and `Any` never reach
/// the VM: the compiler resolves both before a program is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Undecided,
    Int,
    Str,
    Bool,
    Any,
    Addr,
}

impl BaseType {
    /// `true` for the three types that own a storage array.
    #[inline]
    pub fn is_concrete(self) -> bool {
        matches!(self, BaseType::Int | BaseType::Str | BaseType::Bool)
    }

    pub fn name(self) -> &'static str {
        match self {
            BaseType::Undecided => "undecided",
            BaseType::Int => "int",
            BaseType::Str => "str",
            BaseType::Bool => "bool",
            BaseType::Any => "any",
            BaseType::Addr => "addr",
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An owned value read out of (or written into) one of the typed arrays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn base_type(&self) -> BaseType {
        match self {
            Value::Int(_) => BaseType::Int,
            Value::Str(_) => BaseType::Str,
            Value::Bool(_) => BaseType::Bool,
        }
    }

    /// Parse host-supplied text (e.g. a command-line argument) as a value of
    /// type `ty`. Strings are taken verbatim.
    pub fn parse(ty: BaseType, text: &str) -> Option<Self> {
        match ty {
            BaseType::Int => text.parse().ok().map(Value::Int),
            BaseType::Str => Some(Value::Str(text.to_string())),
            BaseType::Bool => match text {
                "true" | "True" => Some(Value::Bool(true)),
                "false" | "False" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}
