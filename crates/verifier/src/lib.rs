//! TAC verifier — whole-program validation before execution.
//!
//! The verifier checks a parsed [`Program`] and lowers it into an
//! [`Executable`]. Nothing runs until every name, label and call site has
//! been resolved. Validation is fail-fast: the first error is returned.
//!
//! # Usage
//!
//! ```
//! use tac_common::{Function, Instruction, Opcode, Operand, Program, ReturnType};
//! use tac_verifier::verify;
//!
//! let mut main = Function::new("main", ReturnType::Void, vec![]);
//! main.instructions.push(Instruction::new(
//!     Opcode::Call,
//!     vec![Operand::Function("puti".to_string()), Operand::Int(42)],
//!     3,
//! ));
//!
//! let executable = verify(&Program::new(vec![main])).unwrap();
//! assert_eq!(executable.routines[executable.entry].name, "main");
//! ```
//!
//! # Passes
//!
//! 1. **Limits** — function size, array length
//! 2. **Calls** — function table, built-in shadowing, entry point
//! 3. **Symbols** — per-function name table, duplicate names
//! 4. **Labels** — per-function label table, branch targets
//! 5. **Lowering** — operand resolution, static types, call sites

pub mod calls;
pub mod error;
pub mod labels;
pub mod limits;
pub mod lower;
pub mod symbols;

pub use error::{DeclarationError, Location, VerifyError};

use tac_common::executable::Routine;
use tac_common::{Executable, Program};
use tracing::debug;

/// Verify a program and lower it for execution.
///
/// Returns the first error found.
pub fn verify(program: &Program) -> Result<Executable, VerifyError> {
    limits::check_limits(program)?;
    let calls = calls::CallGraph::build(program)?;

    let mut routines = Vec::with_capacity(program.functions.len());
    for function in &program.functions {
        let symbols = symbols::resolve_symbols(function)?;
        let labels = labels::resolve_labels(function)?;
        let code = lower::lower_function(function, &symbols, &labels, &calls)?;
        debug!(
            function = %function.name,
            slots = symbols.len(),
            labels = labels.len(),
            instructions = code.len(),
            "function verified"
        );
        routines.push(Routine {
            name: function.name.clone(),
            return_type: function.return_type,
            params: symbols.params(),
            slots: symbols.into_slots(),
            code,
            labels,
        });
    }

    debug!(functions = routines.len(), entry = calls.entry(), "program verified");
    Ok(Executable {
        routines,
        entry: calls.entry(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tac_common::executable::{Arg, Callee, IndexSrc, Op, Place, Src};
    use tac_common::{Intrinsic, ScalarType, TypeError};

    fn check(text: &str) -> Result<Executable, VerifyError> {
        verify(&tac_assembler::assemble(text).unwrap())
    }

    fn main_body(body: &str) -> String {
        format!(
            "#start_function\nvoid main():\nint-list: n, i, A[4]\nfloat-list: x, F[4]\n{body}\n#end_function\n"
        )
    }

    #[test]
    fn minimal_valid_program() {
        let exe = check(&main_body("call, puti, 1")).unwrap();
        assert_eq!(exe.routines.len(), 1);
        assert_eq!(exe.entry, 0);
        assert_eq!(
            exe.routines[0].code[0].op,
            Op::Call {
                callee: Callee::Intrinsic(Intrinsic::Puti),
                args: vec![Arg::Value(Src::Int(1))],
            }
        );
    }

    #[test]
    fn empty_program_has_no_main() {
        let err = verify(&Program::default()).unwrap_err();
        assert_eq!(err.as_declaration(), Some(&DeclarationError::MissingMain));
    }

    #[test]
    fn slots_follow_declaration_order() {
        let exe = check(&main_body("assign, A[i], n")).unwrap();
        let main = &exe.routines[0];
        let names: Vec<_> = main.slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["n", "i", "A", "x", "F"]);
        assert_eq!(
            main.code[0].op,
            Op::Assign {
                dest: Place::Element {
                    array: 2,
                    index: IndexSrc::Slot(1)
                },
                src: Src::Slot(0),
            }
        );
    }

    #[test]
    fn undeclared_variable() {
        let err = check(&main_body("assign, y, 1")).unwrap_err();
        assert_eq!(
            err.as_declaration(),
            Some(&DeclarationError::UndeclaredVariable {
                name: "y".to_string()
            })
        );
        assert_eq!(err.location().line, Some(5));
    }

    #[test]
    fn indexing_a_scalar() {
        let err = check(&main_body("assign, n[0], 1")).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::NotAnArray { .. })
        ));
    }

    #[test]
    fn array_as_scalar() {
        let err = check(&main_body("add, n, A, 1")).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::ArrayUsedAsScalar { .. })
        ));
    }

    #[test]
    fn array_load_needs_array() {
        let err = check(&main_body("array_load, n, i, 0")).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::NotAnArray { name }) if name == "i"
        ));
    }

    #[test]
    fn literal_destination() {
        let err = check(&main_body("add, 3, n, 1")).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::NotAssignable { .. })
        ));
    }

    #[test]
    fn float_index_rejected() {
        let err = check(&main_body("array_load, n, A, x")).unwrap_err();
        assert!(matches!(err.as_type(), Some(TypeError::NonIntIndex { .. })));
    }

    #[test]
    fn bitwise_on_float() {
        let err = check(&main_body("and, n, x, 1")).unwrap_err();
        assert_eq!(err.as_type(), Some(&TypeError::BitwiseOnFloat { op: "and" }));
    }

    #[test]
    fn narrowing_store_rejected_widening_allowed() {
        assert!(check(&main_body("assign, x, n")).is_ok());
        assert!(check(&main_body("add, x, n, 1")).is_ok());
        let err = check(&main_body("add, n, x, 1")).unwrap_err();
        assert_eq!(
            err.as_type(),
            Some(&TypeError::NarrowingStore {
                target: "n".to_string(),
                expected: ScalarType::Int,
                found: ScalarType::Float,
            })
        );
    }

    #[test]
    fn unresolved_label_before_execution() {
        let err = check(&main_body("goto, nowhere")).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::UnresolvedLabel { .. })
        ));
    }

    #[test]
    fn callr_on_void_intrinsic() {
        let err = check(&main_body("callr, n, puti, 1")).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::VoidResult { .. })
        ));
    }

    #[test]
    fn callr_type_mismatch() {
        let err = check(&main_body("callr, n, getf")).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::ReturnTypeMismatch { .. })
        ));
    }

    #[test]
    fn intrinsic_arity() {
        let err = check(&main_body("call, putc")).unwrap_err();
        assert_eq!(
            err.as_declaration(),
            Some(&DeclarationError::ArityMismatch {
                callee: "putc".to_string(),
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn putf_accepts_int_argument() {
        assert!(check(&main_body("call, putf, n")).is_ok());
        let err = check(&main_body("call, puti, x")).unwrap_err();
        assert!(matches!(err.as_type(), Some(TypeError::NarrowingStore { .. })));
    }

    #[test]
    fn return_value_rules() {
        let err = check(&main_body("return, 0")).unwrap_err();
        assert_eq!(
            err.as_declaration(),
            Some(&DeclarationError::UnexpectedReturnValue)
        );

        let text = "\
#start_function
int f():
return
#end_function
#start_function
void main():
#end_function
";
        let err = check(text).unwrap_err();
        assert_eq!(
            err.as_declaration(),
            Some(&DeclarationError::MissingReturnValue {
                expected: ScalarType::Int
            })
        );
        assert_eq!(err.location().function.as_deref(), Some("f"));
    }

    #[test]
    fn array_arguments_by_reference() {
        let text = "\
#start_function
void fill(int[4] B, int v):
array_store, v, B, 0
#end_function
#start_function
void main():
int-list: A[4], C[8]
float-list: F[4]
call, fill, A, 7
#end_function
";
        let exe = check(text).unwrap();
        let main = exe.routine("main").unwrap();
        assert_eq!(
            main.code[0].op,
            Op::Call {
                callee: Callee::Routine(0),
                args: vec![Arg::Array(0), Arg::Value(Src::Int(7))],
            }
        );

        for bad in ["C", "F", "7"] {
            let err = check(&text.replace("call, fill, A, 7", &format!("call, fill, {bad}, 7")))
                .unwrap_err();
            assert!(
                matches!(
                    err.as_declaration(),
                    Some(DeclarationError::ArrayArgMismatch { position: 1, .. })
                ),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn labels_are_lowered_to_indices() {
        let exe = check(&main_body("top:\nadd, i, i, 1\nbrlt, top, i, 10\nend:")).unwrap();
        let main = &exe.routines[0];
        assert_eq!(main.labels["top"], 0);
        assert_eq!(main.labels["end"], 2);
        assert!(matches!(main.code[1].op, Op::Branch { target: 0, .. }));
    }
}
