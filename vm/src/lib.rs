pub mod disasm;
pub mod error;
pub mod loader;
pub mod machine;
pub mod opcode;
pub mod registry;

pub use disasm::disassemble;
pub use error::{Array, RuntimeError};
pub use loader::{load_executable, load_json, validate, write_program, LoaderError};
pub use machine::VM;
pub use opcode::{OpCode, OperandKind};
pub use registry::{OperationDef, Overload, OverloadDef, Registry, RegistryError};
