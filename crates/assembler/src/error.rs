//! Syntax errors for the TAC assembler.

use thiserror::Error;

/// Errors produced while turning program text into a [`Program`].
///
/// Every variant carries the 1-based source line.
///
/// [`Program`]: tac_common::Program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// A character that cannot start any token.
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedCharacter { line: usize, ch: char },

    /// A numeric literal could not be parsed or is out of range.
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    /// A token appeared where it was not expected.
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },

    /// The line ended while more tokens were required.
    #[error("line {line}: unexpected end of line, expected {expected}")]
    UnexpectedEndOfLine { line: usize, expected: &'static str },

    /// An unrecognized opcode mnemonic was encountered.
    #[error("line {line}: unknown opcode '{token}'")]
    UnknownOpcode { line: usize, token: String },

    /// An unrecognized type keyword in a header or parameter.
    #[error("line {line}: unknown type '{token}'")]
    UnknownType { line: usize, token: String },

    /// An opcode received the wrong number of operands.
    #[error("line {line}: {opcode} expects {expected} operand(s), found {found}")]
    WrongOperandCount {
        line: usize,
        opcode: &'static str,
        expected: &'static str,
        found: usize,
    },

    /// `assign, X, size, value` array initialization.
    #[error("line {line}: array initialization via 'assign, name, size, value' is not supported; declare arrays as name[size]")]
    UnsupportedArrayAssign { line: usize },

    /// `#start_function` while a function block is already open.
    #[error("line {line}: #start_function inside an open function block")]
    NestedFunction { line: usize },

    /// `#end_function` without an open function block.
    #[error("line {line}: #end_function without matching #start_function")]
    UnmatchedEndFunction { line: usize },

    /// End of text reached with a function block still open.
    #[error("line {line}: function block opened here is never closed")]
    UnterminatedFunction { line: usize },

    /// The first line of a function block is not a header.
    #[error("line {line}: expected function header 'type name(params)'")]
    ExpectedHeader { line: usize },

    /// Program text outside any function block.
    #[error("line {line}: text outside a function block")]
    OutsideFunction { line: usize },

    /// An `int-list:` or `float-list:` appears twice in one function.
    #[error("line {line}: duplicate {list} in function")]
    DuplicateDeclList { line: usize, list: &'static str },

    /// A declaration list after the first instruction or label.
    #[error("line {line}: declarations must precede instructions")]
    DeclAfterCode { line: usize },
}

impl AsmError {
    /// The source line this error refers to.
    pub fn line(&self) -> usize {
        match self {
            AsmError::UnexpectedCharacter { line, .. }
            | AsmError::InvalidNumber { line, .. }
            | AsmError::UnexpectedToken { line, .. }
            | AsmError::UnexpectedEndOfLine { line, .. }
            | AsmError::UnknownOpcode { line, .. }
            | AsmError::UnknownType { line, .. }
            | AsmError::WrongOperandCount { line, .. }
            | AsmError::UnsupportedArrayAssign { line }
            | AsmError::NestedFunction { line }
            | AsmError::UnmatchedEndFunction { line }
            | AsmError::UnterminatedFunction { line }
            | AsmError::ExpectedHeader { line }
            | AsmError::OutsideFunction { line }
            | AsmError::DuplicateDeclList { line, .. }
            | AsmError::DeclAfterCode { line } => *line,
        }
    }
}
