pub mod codegen;
pub mod config;
pub mod control_flow;
pub mod error;
pub mod interner;
pub mod lexer;
pub mod symbols;

pub use codegen::Compiler;
pub use config::CompilerConfig;
pub use error::{CompileError, CompileErrorKind};

use memory::Program;
use vm::Registry;

/// Compile `source` against `registry` with default limits.
pub fn compile(source: &str, registry: &Registry) -> Result<Program, CompileError> {
    Compiler::new(registry, CompilerConfig::default()).compile(source)
}
