//! Limits checking for TAC programs.
//!
//! Hard caps that keep a single run's memory bounded before anything
//! executes.

use crate::error::{DeclarationError, Location, VerifyError};
use tac_common::{Program, VarType};

/// Maximum instructions in one function body.
pub const MAX_FUNCTION_SIZE: usize = 65_536;

/// Maximum elements in one array declaration or parameter.
pub const MAX_ARRAY_LEN: u32 = 1 << 20;

/// Run the limits check. Stops at the first violation.
pub fn check_limits(program: &Program) -> Result<(), VerifyError> {
    for function in &program.functions {
        let count = function.instructions.len();
        if count > MAX_FUNCTION_SIZE {
            return Err(VerifyError::declaration(
                Location::function(&function.name),
                DeclarationError::TooManyInstructions {
                    count,
                    limit: MAX_FUNCTION_SIZE,
                },
            ));
        }

        let params = function.params.iter().map(|p| (&p.name, p.ty, function.line));
        let decls = function.decls().map(|d| (&d.name, d.var_type(), d.line));
        for (name, ty, line) in params.chain(decls) {
            if let VarType::Array { len, .. } = ty {
                if len > MAX_ARRAY_LEN {
                    return Err(VerifyError::declaration(
                        Location::at(&function.name, line),
                        DeclarationError::ArrayTooLarge {
                            name: name.clone(),
                            len,
                            limit: MAX_ARRAY_LEN,
                        },
                    ));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tac_common::{Decl, Function, Instruction, Opcode, ReturnType, ScalarType};

    fn main_with(decls: Vec<Decl>, body_len: usize) -> Program {
        let mut main = Function::new("main", ReturnType::Void, vec![]);
        main.int_decls = decls;
        main.instructions = (0..body_len)
            .map(|i| Instruction::new(Opcode::Return, vec![], i + 1))
            .collect();
        Program::new(vec![main])
    }

    fn array(name: &str, len: u32) -> Decl {
        Decl {
            name: name.to_string(),
            ty: ScalarType::Int,
            array_len: Some(len),
            line: 3,
        }
    }

    #[test]
    fn small_program_passes() {
        assert!(check_limits(&main_with(vec![array("A", 100)], 4)).is_ok());
    }

    #[test]
    fn array_too_large() {
        let err = check_limits(&main_with(vec![array("A", MAX_ARRAY_LEN + 1)], 1)).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::ArrayTooLarge { len, .. }) if *len == MAX_ARRAY_LEN + 1
        ));
        assert_eq!(err.location().line, Some(3));
    }

    #[test]
    fn function_too_large() {
        let err = check_limits(&main_with(vec![], MAX_FUNCTION_SIZE + 1)).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::TooManyInstructions { .. })
        ));
    }
}
