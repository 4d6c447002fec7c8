//! TAC assembler: program text ↔ program structure.
//!
//! Parsing is line oriented. Each line is tokenized and classified on its
//! own, then fed to a builder that checks block structure
//! (`#start_function` ... `#end_function`), header placement and
//! declaration ordering. Names are not resolved here; that is the
//! verifier's job.
//!
//! # Usage
//!
//! ```
//! use tac_assembler::{assemble, disassemble};
//!
//! let text = "#start_function\nvoid main():\ncall, puti, 42\n#end_function\n";
//! let program = assemble(text).unwrap();
//! assert_eq!(program.functions[0].name, "main");
//! assert_eq!(disassemble(&program), text);
//! ```
//!
//! # Roundtrip Guarantee
//!
//! `disassemble` emits canonical text, and canonical text is a fixed point:
//! `disassemble(&assemble(&disassemble(p))?) == disassemble(p)`. The
//! assembler also accepts non-canonical input (indentation, labels sharing a
//! line with an instruction, headers without the trailing colon).

pub mod error;

mod disassembler;
mod lexer;
mod parser;

pub use error::AsmError;

use lexer::tokenize_line;
use parser::{parse_line, ProgramBuilder};
use tac_common::Program;

/// Assemble text into a program.
///
/// Returns the first error encountered. Fix one error at a time.
pub fn assemble(text: &str) -> Result<Program, AsmError> {
    let mut builder = ProgramBuilder::new();

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        let tokens = tokenize_line(line, line_num)?;
        if let Some(parsed) = parse_line(&tokens, line_num)? {
            builder.push(parsed, line_num)?;
        }
    }

    builder.finish()
}

/// Disassemble a program into canonical text.
///
/// The output is flat text: one header, declaration list, label or
/// instruction per line, no indentation, no comments.
pub fn disassemble(program: &Program) -> String {
    disassembler::disassemble(program)
}
