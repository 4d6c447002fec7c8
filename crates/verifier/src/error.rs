//! Verification errors for the TAC verifier.
//!
//! Every error carries a [`Location`]: the function it was found in and the
//! source line, when those are known. Verification stops at the first error.

use std::fmt;

use tac_common::{ScalarType, TypeError, VarType};
use thiserror::Error;

/// Where an error was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub function: Option<String>,
    pub line: Option<usize>,
}

impl Location {
    /// A program-wide location (no function, no line).
    pub fn program() -> Self {
        Self::default()
    }

    pub fn function(name: &str) -> Self {
        Self {
            function: Some(name.to_string()),
            line: None,
        }
    }

    pub fn at(name: &str, line: usize) -> Self {
        Self {
            function: Some(name.to_string()),
            line: Some(line),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.function, self.line) {
            (Some(name), Some(line)) => write!(f, "function '{name}', line {line}"),
            (Some(name), None) => write!(f, "function '{name}'"),
            (None, Some(line)) => write!(f, "line {line}"),
            (None, None) => f.write_str("program"),
        }
    }
}

/// Name, label and call-site errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    // --- Functions ---
    /// Two functions share a name.
    #[error("function '{name}' is defined more than once (first at line {first_line})")]
    DuplicateFunction { name: String, first_line: usize },

    /// A user function uses the name of a built-in I/O primitive.
    #[error("function '{name}' shadows the built-in of the same name")]
    ShadowsIntrinsic { name: String },

    /// No `main` function.
    #[error("program has no 'main' function")]
    MissingMain,

    /// `main` declares parameters.
    #[error("'main' must not take parameters, found {count}")]
    MainHasParams { count: usize },

    // --- Symbols ---
    /// A parameter or declaration reuses a name.
    #[error("'{name}' is declared more than once")]
    DuplicateName { name: String },

    /// An array declared with size 0.
    #[error("array '{name}' must have at least one element")]
    ZeroLengthArray { name: String },

    /// A variable operand that names nothing.
    #[error("undeclared variable '{name}'")]
    UndeclaredVariable { name: String },

    /// Indexing, or passing as an array, a scalar.
    #[error("'{name}' is not an array")]
    NotAnArray { name: String },

    /// An array name where a scalar value is required.
    #[error("array '{name}' used as a scalar")]
    ArrayUsedAsScalar { name: String },

    /// A literal in a destination position.
    #[error("'{operand}' cannot be assigned to")]
    NotAssignable { operand: String },

    // --- Labels ---
    /// The same label defined twice in one function.
    #[error("label '{label}' is defined more than once (first at line {first_line})")]
    DuplicateLabel { label: String, first_line: usize },

    /// A branch or goto to a label the function does not define.
    #[error("unresolved label '{label}'")]
    UnresolvedLabel { label: String },

    // --- Calls ---
    /// A call to a name that is neither a function nor a built-in.
    #[error("call to unknown function '{name}'")]
    UnknownFunction { name: String },

    /// Argument count differs from the callee's parameter count.
    #[error("'{callee}' takes {expected} argument(s), {found} supplied")]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
    },

    /// `callr` on a callee that returns nothing.
    #[error("'{callee}' returns void; use call instead of callr")]
    VoidResult { callee: String },

    /// `callr` destination type differs from the callee's return type.
    #[error("'{callee}' returns {found}, but the destination is {expected}")]
    ReturnTypeMismatch {
        callee: String,
        expected: ScalarType,
        found: ScalarType,
    },

    /// An array argument that does not match the array parameter.
    #[error("argument {position} of '{callee}' must be an array of type {expected}, found '{found}'")]
    ArrayArgMismatch {
        callee: String,
        position: usize,
        expected: VarType,
        found: String,
    },

    // --- Returns ---
    /// `return, value` in a void function.
    #[error("void function returns a value")]
    UnexpectedReturnValue,

    /// Bare `return` in a function with a return type.
    #[error("function returning {expected} has a return without a value")]
    MissingReturnValue { expected: ScalarType },

    // --- Limits ---
    /// A function body over the instruction limit.
    #[error("function has {count} instructions (max {limit})")]
    TooManyInstructions { count: usize, limit: usize },

    /// An array over the element limit.
    #[error("array '{name}' has {len} elements (max {limit})")]
    ArrayTooLarge { name: String, len: u32, limit: u32 },
}

/// A verification failure: the first error found, with its location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("declaration error in {at}: {error}")]
    Declaration {
        at: Location,
        error: DeclarationError,
    },

    #[error("type error in {at}: {error}")]
    Type { at: Location, error: TypeError },
}

impl VerifyError {
    pub(crate) fn declaration(at: Location, error: DeclarationError) -> Self {
        VerifyError::Declaration { at, error }
    }

    pub(crate) fn type_error(at: Location, error: TypeError) -> Self {
        VerifyError::Type { at, error }
    }

    pub fn location(&self) -> &Location {
        match self {
            VerifyError::Declaration { at, .. } | VerifyError::Type { at, .. } => at,
        }
    }

    /// The declaration error, if this is one.
    pub fn as_declaration(&self) -> Option<&DeclarationError> {
        match self {
            VerifyError::Declaration { error, .. } => Some(error),
            VerifyError::Type { .. } => None,
        }
    }

    /// The type error, if this is one.
    pub fn as_type(&self) -> Option<&TypeError> {
        match self {
            VerifyError::Type { error, .. } => Some(error),
            VerifyError::Declaration { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display() {
        assert_eq!(Location::at("main", 4).to_string(), "function 'main', line 4");
        assert_eq!(Location::function("f").to_string(), "function 'f'");
        assert_eq!(Location::program().to_string(), "program");
    }

    #[test]
    fn verify_error_display() {
        let e = VerifyError::declaration(
            Location::at("main", 7),
            DeclarationError::UnresolvedLabel {
                label: "exit9".to_string(),
            },
        );
        assert_eq!(
            e.to_string(),
            "declaration error in function 'main', line 7: unresolved label 'exit9'"
        );

        let e = VerifyError::type_error(
            Location::at("f", 2),
            TypeError::BitwiseOnFloat { op: "or" },
        );
        assert_eq!(
            e.to_string(),
            "type error in function 'f', line 2: bitwise 'or' applied to a float operand"
        );
    }

    #[test]
    fn accessors() {
        let e = VerifyError::declaration(Location::program(), DeclarationError::MissingMain);
        assert_eq!(e.as_declaration(), Some(&DeclarationError::MissingMain));
        assert!(e.as_type().is_none());
        assert_eq!(e.location(), &Location::program());
    }

    #[test]
    fn all_declaration_variants_display() {
        let errors = vec![
            DeclarationError::DuplicateFunction {
                name: "f".to_string(),
                first_line: 1,
            },
            DeclarationError::ShadowsIntrinsic {
                name: "puti".to_string(),
            },
            DeclarationError::MissingMain,
            DeclarationError::MainHasParams { count: 1 },
            DeclarationError::DuplicateName {
                name: "x".to_string(),
            },
            DeclarationError::ZeroLengthArray {
                name: "A".to_string(),
            },
            DeclarationError::UndeclaredVariable {
                name: "y".to_string(),
            },
            DeclarationError::NotAnArray {
                name: "n".to_string(),
            },
            DeclarationError::ArrayUsedAsScalar {
                name: "A".to_string(),
            },
            DeclarationError::NotAssignable {
                operand: "3".to_string(),
            },
            DeclarationError::DuplicateLabel {
                label: "l".to_string(),
                first_line: 2,
            },
            DeclarationError::UnresolvedLabel {
                label: "l".to_string(),
            },
            DeclarationError::UnknownFunction {
                name: "g".to_string(),
            },
            DeclarationError::ArityMismatch {
                callee: "g".to_string(),
                expected: 2,
                found: 1,
            },
            DeclarationError::VoidResult {
                callee: "puti".to_string(),
            },
            DeclarationError::ReturnTypeMismatch {
                callee: "getf".to_string(),
                expected: ScalarType::Int,
                found: ScalarType::Float,
            },
            DeclarationError::ArrayArgMismatch {
                callee: "sort".to_string(),
                position: 1,
                expected: VarType::Array {
                    elem: ScalarType::Int,
                    len: 100,
                },
                found: "B".to_string(),
            },
            DeclarationError::UnexpectedReturnValue,
            DeclarationError::MissingReturnValue {
                expected: ScalarType::Int,
            },
            DeclarationError::TooManyInstructions {
                count: 70_000,
                limit: 65_536,
            },
            DeclarationError::ArrayTooLarge {
                name: "A".to_string(),
                len: 1 << 30,
                limit: 1 << 20,
            },
        ];

        for error in &errors {
            let display = error.to_string();
            assert!(!display.is_empty(), "empty display for {error:?}");
        }
    }
}
