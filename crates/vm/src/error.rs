//! Runtime errors for the TAC VM.
//!
//! These are errors that can only happen at runtime, not during static
//! verification. Every error raised by an instruction names the function
//! and source line it came from.

use tac_common::TypeError;
use thiserror::Error;

use crate::io::IoError;

/// Errors that abort a run.
///
/// Output written before the error is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Integer or float division by zero.
    #[error("division by zero in '{function}' at line {line}")]
    DivisionByZero { function: String, line: usize },

    /// Array index outside `[0, len)`.
    #[error("index {index} out of bounds for '{array}' (length {len}) in '{function}' at line {line}")]
    IndexOutOfBounds {
        function: String,
        line: usize,
        array: String,
        index: i32,
        len: u32,
    },

    /// Call depth exceeded the configured maximum.
    #[error("stack overflow: call depth exceeded {limit} in '{function}' at line {line}")]
    StackOverflow {
        function: String,
        line: usize,
        limit: usize,
    },

    /// Array memory for a new frame would exceed the configured cap.
    #[error("out of array memory: {requested} more cells exceed the limit of {limit} in '{function}' at line {line}")]
    MemoryExhausted {
        function: String,
        line: usize,
        requested: usize,
        limit: usize,
    },

    /// The configured instruction budget ran out.
    #[error("instruction budget of {budget} exhausted in '{function}' at line {line}")]
    BudgetExhausted {
        function: String,
        line: usize,
        budget: u64,
    },

    /// `putc` with a value that is not a Unicode scalar value.
    #[error("invalid character code {code} in '{function}' at line {line}")]
    InvalidCharCode {
        function: String,
        line: usize,
        code: i32,
    },

    /// A call to a routine index the executable does not contain.
    #[error("call to unknown routine #{index} in '{function}' at line {line}")]
    UnknownFunction {
        function: String,
        line: usize,
        index: usize,
    },

    /// A slot used with the wrong shape (scalar vs array).
    #[error("slot {slot} has the wrong shape in '{function}' at line {line}")]
    InvalidSlot {
        function: String,
        line: usize,
        slot: usize,
    },

    /// Reading input or writing output failed.
    #[error("I/O error in '{function}' at line {line}: {error}")]
    Io {
        function: String,
        line: usize,
        error: IoError,
    },

    /// An operator applied to incompatible values.
    #[error("type error in '{function}' at line {line}: {error}")]
    Type {
        function: String,
        line: usize,
        error: TypeError,
    },

    /// `run` called on a VM that has already run.
    #[error("program has already been run")]
    AlreadyRun,
}

impl RuntimeError {
    /// Source line of the failing instruction, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            RuntimeError::DivisionByZero { line, .. }
            | RuntimeError::IndexOutOfBounds { line, .. }
            | RuntimeError::StackOverflow { line, .. }
            | RuntimeError::MemoryExhausted { line, .. }
            | RuntimeError::BudgetExhausted { line, .. }
            | RuntimeError::InvalidCharCode { line, .. }
            | RuntimeError::UnknownFunction { line, .. }
            | RuntimeError::InvalidSlot { line, .. }
            | RuntimeError::Io { line, .. }
            | RuntimeError::Type { line, .. } => Some(*line),
            RuntimeError::AlreadyRun => None,
        }
    }

    /// Whether this is an input/output failure rather than a program fault.
    pub fn is_io(&self) -> bool {
        matches!(self, RuntimeError::Io { .. })
    }
}
