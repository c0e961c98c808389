use std::io::{self, Write};

use anyhow::{Context, Result};
use compiler::CompilerConfig;

use super::{builtin_registry, compile::compile_file, load_program};

pub fn run_file(
    path: &str,
    compile_only: bool,
    args: &[String],
    config: &CompilerConfig,
) -> Result<()> {
    if compile_only {
        return compile_file(path, None, config).map(|_| ());
    }
    execute(path, args, config, io::stderr()).map(|_| ())
}

/// Load or compile `path`, bind `args` to its input parameters, and run it
/// with `print` output going to `out`. Returns the sink.
pub fn execute<W: Write>(
    path: &str,
    args: &[String],
    config: &CompilerConfig,
    out: W,
) -> Result<W> {
    let registry = builtin_registry()?;
    let mut program = load_program(path, &registry, config)?;

    let values = program
        .parse_params(args)
        .context("Invalid input parameters")?;
    program
        .bind_params(&values)
        .context("Invalid input parameters")?;

    let mut vm = vm::VM::with_output(&registry, out);
    vm.interpret(&mut program)
        .with_context(|| format!("Runtime error in {}", path))?;
    Ok(vm.into_output())
}
