//! TAC virtual machine — executes verified programs.
//!
//! The VM is a frame-stack machine with:
//! - An explicit, depth-checked stack of frames (no host recursion)
//! - One array memory; each frame owns the arrays it declares and array
//!   parameters alias the caller's storage
//! - A lazy input token reader and any [`std::io::Write`] output sink
//!
//! # Usage
//!
//! ```
//! use tac_vm::run_with_input;
//!
//! let text = "\
//! #start_function
//! void main():
//! int-list: a, b
//!     callr, a, geti
//!     callr, b, geti
//!     add, a, a, b
//!     call, puti, a
//! #end_function
//! ";
//! let program = tac_assembler::assemble(text).unwrap();
//! let exe = tac_verifier::verify(&program).unwrap();
//!
//! let outcome = run_with_input(&exe, "40 2");
//! assert!(outcome.result.is_ok());
//! assert_eq!(outcome.output, "42");
//! ```

pub mod error;
pub mod execute;
pub mod io;
pub mod machine;

pub use error::RuntimeError;
pub use io::{IoError, TokenReader};
pub use machine::{RunState, VmConfig, MAX_CALL_DEPTH, MAX_MEMORY_CELLS, VM};

use tac_common::Executable;

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Captured output, including anything written before a failure.
    pub output: String,
    /// Instructions executed.
    pub steps: u64,
    pub result: Result<(), RuntimeError>,
}

/// Run `exe` against an in-memory input with the default configuration.
pub fn run_with_input(exe: &Executable, input: &str) -> RunOutput {
    run_with_config(exe, input, VmConfig::default())
}

/// Run `exe` against an in-memory input, capturing output.
pub fn run_with_config(exe: &Executable, input: &str, config: VmConfig) -> RunOutput {
    let mut vm = VM::new(exe, input.as_bytes(), Vec::new(), config);
    let result = vm.run();
    let steps = vm.steps();
    let output = String::from_utf8_lossy(&vm.into_output()).into_owned();
    RunOutput {
        output,
        steps,
        result,
    }
}
