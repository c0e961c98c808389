use anyhow::{Context, Result};
use compiler::CompilerConfig;

use super::{builtin_registry, load_program};

pub fn disassemble_file(path: &str, config: &CompilerConfig) -> Result<()> {
    print!("{}", render(path, config)?);
    Ok(())
}

/// Listing of `path`, headed by its name.
pub fn render(path: &str, config: &CompilerConfig) -> Result<String> {
    let registry = builtin_registry()?;
    let program = load_program(path, &registry, config)?;
    let listing = vm::disassemble(&program, &registry).context("Failed to disassemble")?;
    Ok(format!("== Disassembly of {} ==\n{}", path, listing))
}
