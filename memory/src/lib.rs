pub mod program;
pub mod value;


pub use program::{BoolAddr, DebugSymbols, IntAddr, Param, ParamError, Program, Slot, StrAddr};
pub use value::{BaseType, Value};
