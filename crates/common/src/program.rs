//! Parsed program structure: functions, declarations, labels.

use crate::instruction::Instruction;
use crate::types::{ReturnType, ScalarType, VarType};

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: VarType,
}

/// A local declaration from `int-list:` or `float-list:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub name: String,
    pub ty: ScalarType,
    /// `Some(size)` for `name[size]`, `None` for a scalar.
    pub array_len: Option<u32>,
    /// 1-based line of the declaration list.
    pub line: usize,
}

impl Decl {
    pub fn var_type(&self) -> VarType {
        match self.array_len {
            Some(len) => VarType::Array { elem: self.ty, len },
            None => VarType::Scalar(self.ty),
        }
    }
}

/// A label definition: the name and the index of the instruction it
/// precedes. `at == instructions.len()` marks the end of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDef {
    pub name: String,
    pub at: usize,
    pub line: usize,
}

/// One `#start_function` ... `#end_function` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub return_type: ReturnType,
    pub params: Vec<Param>,
    pub int_decls: Vec<Decl>,
    pub float_decls: Vec<Decl>,
    pub instructions: Vec<Instruction>,
    pub labels: Vec<LabelDef>,
    /// 1-based line of the header.
    pub line: usize,
}

impl Function {
    /// Create an empty function with the given signature.
    pub fn new(name: impl Into<String>, return_type: ReturnType, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            return_type,
            params,
            int_decls: Vec::new(),
            float_decls: Vec::new(),
            instructions: Vec::new(),
            labels: Vec::new(),
            line: 0,
        }
    }

    /// All declarations, ints first.
    pub fn decls(&self) -> impl Iterator<Item = &Decl> {
        self.int_decls.iter().chain(self.float_decls.iter())
    }
}

/// A whole program: functions in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    /// Create a new program from a vector of functions.
    pub fn new(functions: Vec<Function>) -> Self {
        Self { functions }
    }

    /// Find a function by name (the first, if duplicated).
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Number of functions in the program.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if the program has no functions.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, ty: ScalarType, len: Option<u32>) -> Decl {
        Decl {
            name: name.to_string(),
            ty,
            array_len: len,
            line: 1,
        }
    }

    #[test]
    fn empty_program() {
        let program = Program::default();
        assert!(program.is_empty());
        assert_eq!(program.len(), 0);
        assert!(program.function("main").is_none());
    }

    #[test]
    fn lookup_by_name() {
        let program = Program::new(vec![
            Function::new("helper", ReturnType::Scalar(ScalarType::Int), vec![]),
            Function::new("main", ReturnType::Void, vec![]),
        ]);
        assert_eq!(program.len(), 2);
        assert_eq!(program.function("main").unwrap().name, "main");
    }

    #[test]
    fn decl_var_types() {
        assert_eq!(
            decl("A", ScalarType::Int, Some(100)).var_type(),
            VarType::Array {
                elem: ScalarType::Int,
                len: 100
            }
        );
        assert_eq!(
            decl("x", ScalarType::Float, None).var_type(),
            VarType::Scalar(ScalarType::Float)
        );
    }

    #[test]
    fn decls_ints_first() {
        let mut f = Function::new("main", ReturnType::Void, vec![]);
        f.float_decls.push(decl("y", ScalarType::Float, None));
        f.int_decls.push(decl("x", ScalarType::Int, None));
        let names: Vec<_> = f.decls().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
    }
}
