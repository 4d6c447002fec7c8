//! Call graph validation.
//!
//! Collects every function signature once, then checks each `call`/`callr`
//! site against it: the callee exists exactly once (or is a built-in), the
//! argument count matches, and for `callr` the return type matches the
//! destination.

use std::collections::HashMap;

use crate::error::{DeclarationError, Location, VerifyError};
use tac_common::executable::Callee;
use tac_common::{Intrinsic, Program, ReturnType, ScalarType, VarType};

/// Name of the entry function.
pub const ENTRY: &str = "main";

/// A callee's resolved target and signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub callee: Callee,
    pub params: Vec<VarType>,
    pub return_type: ReturnType,
}

/// Every callable name in a program.
#[derive(Debug, Clone)]
pub struct CallGraph {
    by_name: HashMap<String, usize>,
    signatures: Vec<Signature>,
    entry: usize,
}

impl CallGraph {
    /// Collect function signatures and locate the entry point.
    pub fn build(program: &Program) -> Result<Self, VerifyError> {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut signatures = Vec::with_capacity(program.functions.len());

        for (index, function) in program.functions.iter().enumerate() {
            let at = Location::at(&function.name, function.line);
            if Intrinsic::from_name(&function.name).is_some() {
                return Err(VerifyError::declaration(
                    at,
                    DeclarationError::ShadowsIntrinsic {
                        name: function.name.clone(),
                    },
                ));
            }
            if let Some(&first) = by_name.get(&function.name) {
                let first_line = program.functions[first].line;
                return Err(VerifyError::declaration(
                    at,
                    DeclarationError::DuplicateFunction {
                        name: function.name.clone(),
                        first_line,
                    },
                ));
            }
            by_name.insert(function.name.clone(), index);
            signatures.push(Signature {
                callee: Callee::Routine(index),
                params: function.params.iter().map(|p| p.ty).collect(),
                return_type: function.return_type,
            });
        }

        let entry = *by_name.get(ENTRY).ok_or_else(|| {
            VerifyError::declaration(Location::program(), DeclarationError::MissingMain)
        })?;
        let main = &program.functions[entry];
        if !main.params.is_empty() {
            return Err(VerifyError::declaration(
                Location::at(ENTRY, main.line),
                DeclarationError::MainHasParams {
                    count: main.params.len(),
                },
            ));
        }

        Ok(Self {
            by_name,
            signatures,
            entry,
        })
    }

    /// Index of `main`.
    pub fn entry(&self) -> usize {
        self.entry
    }

    /// Look up a callee: user functions first, then built-ins.
    pub fn lookup(&self, name: &str) -> Option<Signature> {
        if let Some(&index) = self.by_name.get(name) {
            return Some(self.signatures[index].clone());
        }
        Intrinsic::from_name(name).map(|intrinsic| Signature {
            callee: Callee::Intrinsic(intrinsic),
            params: intrinsic
                .params()
                .iter()
                .map(|&ty| VarType::Scalar(ty))
                .collect(),
            return_type: intrinsic.return_type(),
        })
    }

    /// Check one call site.
    ///
    /// `dest` is the declared type of the `callr` destination, `None` for
    /// `call`.
    pub fn check_site(
        &self,
        name: &str,
        args: usize,
        dest: Option<ScalarType>,
    ) -> Result<Signature, DeclarationError> {
        let signature = self
            .lookup(name)
            .ok_or_else(|| DeclarationError::UnknownFunction {
                name: name.to_string(),
            })?;

        if signature.params.len() != args {
            return Err(DeclarationError::ArityMismatch {
                callee: name.to_string(),
                expected: signature.params.len(),
                found: args,
            });
        }

        if let Some(expected) = dest {
            match signature.return_type {
                ReturnType::Void => {
                    return Err(DeclarationError::VoidResult {
                        callee: name.to_string(),
                    })
                }
                ReturnType::Scalar(found) if found != expected => {
                    return Err(DeclarationError::ReturnTypeMismatch {
                        callee: name.to_string(),
                        expected,
                        found,
                    })
                }
                ReturnType::Scalar(_) => {}
            }
        }

        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tac_common::{Function, Param};

    fn program(functions: Vec<Function>) -> Program {
        Program::new(functions)
    }

    fn sum() -> Function {
        let mut f = Function::new(
            "sum",
            ReturnType::Scalar(ScalarType::Int),
            vec![
                Param {
                    name: "a".to_string(),
                    ty: VarType::Scalar(ScalarType::Int),
                },
                Param {
                    name: "b".to_string(),
                    ty: VarType::Scalar(ScalarType::Int),
                },
            ],
        );
        f.line = 2;
        f
    }

    fn main() -> Function {
        Function::new("main", ReturnType::Void, vec![])
    }

    #[test]
    fn entry_is_main() {
        let graph = CallGraph::build(&program(vec![sum(), main()])).unwrap();
        assert_eq!(graph.entry(), 1);
    }

    #[test]
    fn missing_main() {
        let err = CallGraph::build(&program(vec![sum()])).unwrap_err();
        assert_eq!(err.as_declaration(), Some(&DeclarationError::MissingMain));
    }

    #[test]
    fn main_with_params() {
        let mut m = sum();
        m.name = "main".to_string();
        let err = CallGraph::build(&program(vec![m])).unwrap_err();
        assert_eq!(
            err.as_declaration(),
            Some(&DeclarationError::MainHasParams { count: 2 })
        );
    }

    #[test]
    fn duplicate_function() {
        let err = CallGraph::build(&program(vec![sum(), sum(), main()])).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::DuplicateFunction { first_line: 2, .. })
        ));
    }

    #[test]
    fn intrinsic_cannot_be_redefined() {
        let f = Function::new("puti", ReturnType::Void, vec![]);
        let err = CallGraph::build(&program(vec![f, main()])).unwrap_err();
        assert!(matches!(
            err.as_declaration(),
            Some(DeclarationError::ShadowsIntrinsic { .. })
        ));
    }

    #[test]
    fn call_sites() {
        let graph = CallGraph::build(&program(vec![sum(), main()])).unwrap();

        let sig = graph.check_site("sum", 2, Some(ScalarType::Int)).unwrap();
        assert_eq!(sig.callee, Callee::Routine(0));

        assert_eq!(
            graph.check_site("sum", 1, None),
            Err(DeclarationError::ArityMismatch {
                callee: "sum".to_string(),
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            graph.check_site("sum", 2, Some(ScalarType::Float)),
            Err(DeclarationError::ReturnTypeMismatch {
                callee: "sum".to_string(),
                expected: ScalarType::Float,
                found: ScalarType::Int
            })
        );
        assert!(matches!(
            graph.check_site("nope", 0, None),
            Err(DeclarationError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn intrinsic_sites() {
        let graph = CallGraph::build(&program(vec![main()])).unwrap();
        let sig = graph.check_site("geti", 0, Some(ScalarType::Int)).unwrap();
        assert_eq!(sig.callee, Callee::Intrinsic(Intrinsic::Geti));
        assert_eq!(
            graph.check_site("puti", 1, Some(ScalarType::Int)),
            Err(DeclarationError::VoidResult {
                callee: "puti".to_string()
            })
        );
        assert!(graph.check_site("putc", 1, None).is_ok());
        assert!(graph.check_site("main", 0, None).is_ok());
    }
}
