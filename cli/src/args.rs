use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rill")]
#[command(about = "Rill CLI", long_about = None, version)]
pub struct Cli {
    /// Config file (defaults to ./rill.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Override the maximum source line length, in bytes
    #[arg(long, global = true)]
    pub max_line_len: Option<usize>,
    /// Override the maximum number of source lines
    #[arg(long, global = true)]
    pub max_lines: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a source file (.rl) or a compiled program (.rlc / .rlb)
    Run {
        /// Path to the file
        path: String,
        /// Compile and save the JSON program next to the source instead of running
        #[arg(short, long)]
        compile: bool,
        /// Input parameter values, by position
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Compile a source file to JSON (.rlc) or binary (.rlb)
    Compile {
        /// Input source file
        path: String,
        /// Output file; the extension picks the format (default: <stem>.rlc)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a source file or compiled program
    Disassemble {
        /// Path to the file
        path: String,
    },
}
