//! Runtime value representation.

use std::fmt;

use crate::types::ScalarType;

/// A runtime scalar. Every variable and array element holds exactly one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
}

impl Value {
    /// The zero value of a type; fresh locals and arrays start here.
    pub fn zero(ty: ScalarType) -> Value {
        match ty {
            ScalarType::Int => Value::Int(0),
            ScalarType::Float => Value::Float(0.0),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Value::Int(_) => ScalarType::Int,
            Value::Float(_) => ScalarType::Float,
        }
    }

    /// Numeric view as `f32` (ints widen).
    pub fn as_f32(&self) -> f32 {
        match *self {
            Value::Int(n) => n as f32,
            Value::Float(x) => x,
        }
    }

    /// Convert for storage into a location of type `ty`.
    ///
    /// Returns `None` for a float-to-int narrowing, which the verifier
    /// rejects statically.
    pub fn coerce(self, ty: ScalarType) -> Option<Value> {
        match (self, ty) {
            (Value::Int(_), ScalarType::Int) | (Value::Float(_), ScalarType::Float) => Some(self),
            (Value::Int(n), ScalarType::Float) => Some(Value::Float(n as f32)),
            (Value::Float(_), ScalarType::Int) => None,
        }
    }
}

/// Render a float in shortest round-trip form, always with a fractional
/// part or exponent (`3.0`, `0.25`, `1e20`).
pub fn format_float(x: f32) -> String {
    format!("{x:?}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
        }
    }
}
