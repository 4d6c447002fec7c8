//! TAC CLI — check, format and run three-address code programs.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input/usage/syntax error
//! - 2: Verification failure
//! - 3: Runtime error

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tac_vm::{VmConfig, MAX_CALL_DEPTH, MAX_MEMORY_CELLS};

#[derive(Parser, Debug)]
#[command(name = "tac", version)]
#[command(about = "Check, format and run three-address code programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and verify a program
    Check {
        /// Program text
        file: PathBuf,
    },
    /// Verify and run a program
    Run {
        /// Program text
        file: PathBuf,
        /// Read program input from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
        /// Maximum call depth, main included
        #[arg(long, default_value_t = MAX_CALL_DEPTH)]
        max_depth: usize,
        /// Abort after this many instructions
        #[arg(long)]
        budget: Option<u64>,
        /// Maximum live array cells across all frames
        #[arg(long, default_value_t = MAX_MEMORY_CELLS)]
        max_memory: usize,
    },
    /// Print a program in canonical form
    Fmt {
        /// Program text
        file: PathBuf,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    tac_cli::init_logging();

    let result = match cli.command {
        Command::Check { file } => commands::check(&file),
        Command::Run {
            file,
            input,
            max_depth,
            budget,
            max_memory,
        } => {
            let config = VmConfig {
                max_call_depth: max_depth,
                instruction_budget: budget,
                max_memory_cells: max_memory,
            };
            commands::run(&file, input.as_deref(), config)
        }
        Command::Fmt { file } => commands::fmt(&file),
    };

    if let Err(code) = result {
        process::exit(code);
    }
}
