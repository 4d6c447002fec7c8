//! Scalar, declaration and return types.

use std::fmt;

/// The two scalar element types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// 32-bit signed integer.
    Int,
    /// 32-bit IEEE 754 float.
    Float,
}

impl ScalarType {
    /// Keyword used in headers and parameter lists.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::Float => "float",
        }
    }

    /// Parse a type keyword.
    pub fn from_name(name: &str) -> Option<ScalarType> {
        match name {
            "int" => Some(ScalarType::Int),
            "float" => Some(ScalarType::Float),
            _ => None,
        }
    }

    /// The wider of two types: `float` if either is `float`.
    pub fn widen(self, other: ScalarType) -> ScalarType {
        if self == ScalarType::Float || other == ScalarType::Float {
            ScalarType::Float
        } else {
            ScalarType::Int
        }
    }

    /// Whether a value of type `from` may be stored in a location of this type.
    ///
    /// `int` widens to `float`; `float` never narrows to `int`.
    pub fn accepts(self, from: ScalarType) -> bool {
        self == from || (self == ScalarType::Float && from == ScalarType::Int)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape and element type of a declared name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    /// A single value.
    Scalar(ScalarType),
    /// A fixed-length array.
    Array { elem: ScalarType, len: u32 },
}

impl VarType {
    /// The element type (the type itself for scalars).
    pub fn scalar(&self) -> ScalarType {
        match self {
            VarType::Scalar(ty) => *ty,
            VarType::Array { elem, .. } => *elem,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, VarType::Array { .. })
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Scalar(ty) => write!(f, "{ty}"),
            VarType::Array { elem, len } => write!(f, "{elem}[{len}]"),
        }
    }
}

/// Declared return type of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Void,
    Scalar(ScalarType),
}

impl ReturnType {
    /// Parse a header return-type keyword.
    pub fn from_name(name: &str) -> Option<ReturnType> {
        match name {
            "void" => Some(ReturnType::Void),
            other => ScalarType::from_name(other).map(ReturnType::Scalar),
        }
    }

    pub fn is_void(&self) -> bool {
        *self == ReturnType::Void
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Void => f.write_str("void"),
            ReturnType::Scalar(ty) => write!(f, "{ty}"),
        }
    }
}
