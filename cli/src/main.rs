use anyhow::Result;
use clap::Parser;

use cli::args::{Cli, Commands};
use cli::commands::{compile, disassemble, run};
use cli::config::RillConfig;
use cli::logging::init_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = RillConfig::load(cli.config.as_deref())?
        .with_overrides(cli.max_line_len, cli.max_lines)
        .compiler;

    match &cli.command {
        Commands::Run {
            path,
            compile,
            args,
        } => run::run_file(path, *compile, args, &config),
        Commands::Compile { path, output } => {
            compile::compile_file(path, output.as_deref(), &config).map(|_| ())
        }
        Commands::Disassemble { path } => disassemble::disassemble_file(path, &config),
    }
}
