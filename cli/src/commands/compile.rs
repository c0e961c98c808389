use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use compiler::{Compiler, CompilerConfig};
use tracing::info;

use super::{builtin_registry, BINARY_EXT, JSON_EXT};

/// Compile `path` and save it. The output extension selects the format:
/// `.rlb` is binary, anything else JSON. Returns the written path.
pub fn compile_file(path: &str, output: Option<&str>, config: &CompilerConfig) -> Result<PathBuf> {
    let content = fs::read_to_string(path).context("Failed to read file")?;
    let registry = builtin_registry()?;
    let program = Compiler::new(&registry, *config)
        .compile(&content)
        .with_context(|| format!("Compile error in {}", path))?;

    let out_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(path).with_extension(JSON_EXT));

    if out_path.extension().and_then(|e| e.to_str()) == Some(BINARY_EXT) {
        let file = fs::File::create(&out_path).context("Failed to create output file")?;
        let mut writer = BufWriter::new(file);
        vm::write_program(&mut writer, &program).context("Failed to write binary")?;
    } else {
        let json = program.to_json().context("Failed to serialize program")?;
        fs::write(&out_path, json).context("Failed to create output file")?;
    }

    info!(words = program.op_addrs.len(), "compiled");
    println!("Saved program to {}", out_path.display());
    Ok(out_path)
}
