pub mod compile;
pub mod disassemble;
pub mod run;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use compiler::{Compiler, CompilerConfig};
use memory::Program;
use vm::Registry;

/// Compiled JSON program
pub const JSON_EXT: &str = "rlc";
/// Compiled binary program
pub const BINARY_EXT: &str = "rlb";

pub(crate) fn builtin_registry() -> Result<Registry> {
    Registry::builtin().context("Failed to build operation registry")
}

/// Decode a compiled program, or compile a source file, depending on the
/// extension of `path`.
pub fn load_program(path: &str, registry: &Registry, config: &CompilerConfig) -> Result<Program> {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(JSON_EXT) => {
            let text = fs::read_to_string(path).context("Failed to read file")?;
            vm::load_json(&text, registry)
                .with_context(|| format!("Failed to load program {}", path))
        }
        Some(BINARY_EXT) => {
            let mut file = fs::File::open(path).context("Failed to open binary file")?;
            vm::load_executable(&mut file, registry)
                .with_context(|| format!("Failed to load program {}", path))
        }
        _ => {
            let source = fs::read_to_string(path).context("Failed to read file")?;
            Compiler::new(registry, *config)
                .compile(&source)
                .with_context(|| format!("Compile error in {}", path))
        }
    }
}
