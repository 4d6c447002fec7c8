//! Type errors shared by the verifier (static) and the VM (defensive).

use thiserror::Error;

use crate::types::ScalarType;

/// An operator or store applied to incompatible operand types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// `and`/`or` with a float operand.
    #[error("bitwise '{op}' applied to a float operand")]
    BitwiseOnFloat { op: &'static str },

    /// A float value stored into an int location.
    #[error("cannot store {found} value into {expected} location '{target}'")]
    NarrowingStore {
        target: String,
        expected: ScalarType,
        found: ScalarType,
    },

    /// An index operand that is not an int.
    #[error("array index for '{array}' must be int, found {found}")]
    NonIntIndex { array: String, found: ScalarType },
}
