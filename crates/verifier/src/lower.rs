//! Operand resolution, static typing, and lowering to [`Step`]s.
//!
//! Runs after the symbol table, label table and call graph exist. Each
//! instruction's operands are resolved to slots, labels to instruction
//! indices and callees to routine indices, and every store is type checked:
//! `int` widens to `float` implicitly, `float` never narrows to `int`.

use std::collections::HashMap;

use crate::calls::CallGraph;
use crate::error::{DeclarationError, Location, VerifyError};
use crate::symbols::SymbolTable;
use tac_common::executable::{
    Arg, ArithOp, BitOp, Callee, Cond, IndexSrc, Op, Place, SlotId, Src, Step,
};
use tac_common::{
    Function, Index, Instruction, Opcode, Operand, ReturnType, ScalarType, TypeError, VarType,
};

/// Lower every instruction of `function`.
pub fn lower_function(
    function: &Function,
    symbols: &SymbolTable,
    labels: &HashMap<String, usize>,
    calls: &CallGraph,
) -> Result<Vec<Step>, VerifyError> {
    let mut lowerer = Lowerer {
        function,
        symbols,
        labels,
        calls,
        line: function.line,
    };

    function
        .instructions
        .iter()
        .map(|instr| {
            lowerer.line = instr.line;
            Ok(Step {
                op: lowerer.lower(instr)?,
                line: instr.line,
            })
        })
        .collect()
}

struct Lowerer<'a> {
    function: &'a Function,
    symbols: &'a SymbolTable,
    labels: &'a HashMap<String, usize>,
    calls: &'a CallGraph,
    /// Line of the instruction being lowered.
    line: usize,
}

impl Lowerer<'_> {
    fn at(&self) -> Location {
        Location::at(&self.function.name, self.line)
    }

    fn declaration(&self, error: DeclarationError) -> VerifyError {
        VerifyError::declaration(self.at(), error)
    }

    fn type_error(&self, error: TypeError) -> VerifyError {
        VerifyError::type_error(self.at(), error)
    }

    fn lower(&self, instr: &Instruction) -> Result<Op, VerifyError> {
        let ops = &instr.operands;
        match instr.opcode {
            Opcode::Assign => {
                let (dest, dest_ty, target) = self.place(&ops[0])?;
                let (src, src_ty) = self.src(&ops[1])?;
                self.check_store(&target, dest_ty, src_ty)?;
                Ok(Op::Assign { dest, src })
            }

            Opcode::Add | Opcode::Sub | Opcode::Mult | Opcode::Div => {
                let op = match instr.opcode {
                    Opcode::Add => ArithOp::Add,
                    Opcode::Sub => ArithOp::Sub,
                    Opcode::Mult => ArithOp::Mult,
                    _ => ArithOp::Div,
                };
                let (dest, dest_ty, target) = self.place(&ops[0])?;
                let (lhs, lhs_ty) = self.src(&ops[1])?;
                let (rhs, rhs_ty) = self.src(&ops[2])?;
                self.check_store(&target, dest_ty, lhs_ty.widen(rhs_ty))?;
                Ok(Op::Arith { op, dest, lhs, rhs })
            }

            Opcode::And | Opcode::Or => {
                let op = if instr.opcode == Opcode::And {
                    BitOp::And
                } else {
                    BitOp::Or
                };
                let (dest, dest_ty, target) = self.place(&ops[0])?;
                let (lhs, lhs_ty) = self.src(&ops[1])?;
                let (rhs, rhs_ty) = self.src(&ops[2])?;
                if lhs_ty == ScalarType::Float || rhs_ty == ScalarType::Float {
                    return Err(self.type_error(TypeError::BitwiseOnFloat {
                        op: op.mnemonic(),
                    }));
                }
                self.check_store(&target, dest_ty, ScalarType::Int)?;
                Ok(Op::Bitwise { op, dest, lhs, rhs })
            }

            Opcode::Goto => Ok(Op::Goto {
                target: self.label(&ops[0])?,
            }),

            Opcode::Breq
            | Opcode::Brneq
            | Opcode::Brlt
            | Opcode::Brgt
            | Opcode::Brgeq
            | Opcode::Brleq => {
                let cond = match instr.opcode {
                    Opcode::Breq => Cond::Eq,
                    Opcode::Brneq => Cond::Neq,
                    Opcode::Brlt => Cond::Lt,
                    Opcode::Brgt => Cond::Gt,
                    Opcode::Brgeq => Cond::Geq,
                    _ => Cond::Leq,
                };
                let target = self.label(&ops[0])?;
                let (lhs, _) = self.src(&ops[1])?;
                let (rhs, _) = self.src(&ops[2])?;
                Ok(Op::Branch {
                    cond,
                    target,
                    lhs,
                    rhs,
                })
            }

            Opcode::Return => self.lower_return(ops.first()),

            Opcode::Call => {
                let name = self.function_name(&ops[0])?;
                let (callee, args) = self.lower_call(name, &ops[1..], None)?;
                Ok(Op::Call { callee, args })
            }

            Opcode::Callr => {
                let (dest, dest_ty, _) = self.place(&ops[0])?;
                let name = self.function_name(&ops[1])?;
                let (callee, args) = self.lower_call(name, &ops[2..], Some(dest_ty))?;
                Ok(Op::Callr { dest, callee, args })
            }

            Opcode::ArrayLoad => {
                let (dest, dest_ty, target) = self.place(&ops[0])?;
                let (array, elem, array_name) = self.array(&ops[1])?;
                let index = self.index_src(array_name, &ops[2])?;
                self.check_store(&target, dest_ty, elem)?;
                Ok(Op::ArrayLoad { dest, array, index })
            }

            Opcode::ArrayStore => {
                let (value, value_ty) = self.src(&ops[0])?;
                let (array, elem, array_name) = self.array(&ops[1])?;
                let index = self.index_src(array_name, &ops[2])?;
                self.check_store(array_name, elem, value_ty)?;
                Ok(Op::ArrayStore {
                    value,
                    array,
                    index,
                })
            }
        }
    }

    fn lower_return(&self, value: Option<&Operand>) -> Result<Op, VerifyError> {
        match (self.function.return_type, value) {
            (ReturnType::Void, None) => Ok(Op::Return { value: None }),
            (ReturnType::Void, Some(_)) => {
                Err(self.declaration(DeclarationError::UnexpectedReturnValue))
            }
            (ReturnType::Scalar(expected), None) => {
                Err(self.declaration(DeclarationError::MissingReturnValue { expected }))
            }
            (ReturnType::Scalar(expected), Some(operand)) => {
                let (src, found) = self.src(operand)?;
                self.check_store("return value", expected, found)?;
                Ok(Op::Return { value: Some(src) })
            }
        }
    }

    fn lower_call(
        &self,
        name: &str,
        operands: &[Operand],
        dest: Option<ScalarType>,
    ) -> Result<(Callee, Vec<Arg>), VerifyError> {
        let signature = self
            .calls
            .check_site(name, operands.len(), dest)
            .map_err(|e| self.declaration(e))?;

        let mut args = Vec::with_capacity(operands.len());
        for (position, (operand, param)) in operands.iter().zip(&signature.params).enumerate() {
            let arg = match *param {
                VarType::Array { .. } => {
                    Arg::Array(self.array_arg(name, position + 1, operand, *param)?)
                }
                VarType::Scalar(expected) => {
                    let (src, found) = self.src(operand)?;
                    let target = format!("argument {} of '{name}'", position + 1);
                    self.check_store(&target, expected, found)?;
                    Arg::Value(src)
                }
            };
            args.push(arg);
        }

        Ok((signature.callee, args))
    }

    /// An array passed by reference; its type must equal the parameter's.
    fn array_arg(
        &self,
        callee: &str,
        position: usize,
        operand: &Operand,
        expected: VarType,
    ) -> Result<SlotId, VerifyError> {
        let mismatch = || {
            self.declaration(DeclarationError::ArrayArgMismatch {
                callee: callee.to_string(),
                position,
                expected,
                found: operand.to_string(),
            })
        };
        match operand {
            Operand::Var(name) => match self.symbols.lookup(name) {
                None => Err(self.undeclared(name)),
                Some((slot, ty)) if ty == expected => Ok(slot),
                Some(_) => Err(mismatch()),
            },
            _ => Err(mismatch()),
        }
    }

    fn check_store(
        &self,
        target: &str,
        expected: ScalarType,
        found: ScalarType,
    ) -> Result<(), VerifyError> {
        if expected.accepts(found) {
            Ok(())
        } else {
            Err(self.type_error(TypeError::NarrowingStore {
                target: target.to_string(),
                expected,
                found,
            }))
        }
    }

    fn undeclared(&self, name: &str) -> VerifyError {
        self.declaration(DeclarationError::UndeclaredVariable {
            name: name.to_string(),
        })
    }

    /// A scalar variable's slot and type.
    fn scalar(&self, name: &str) -> Result<(SlotId, ScalarType), VerifyError> {
        match self.symbols.lookup(name) {
            None => Err(self.undeclared(name)),
            Some((_, VarType::Array { .. })) => {
                Err(self.declaration(DeclarationError::ArrayUsedAsScalar {
                    name: name.to_string(),
                }))
            }
            Some((slot, VarType::Scalar(ty))) => Ok((slot, ty)),
        }
    }

    /// An array name in an array position.
    fn array<'o>(&self, operand: &'o Operand) -> Result<(SlotId, ScalarType, &'o str), VerifyError> {
        let name = match operand {
            Operand::Var(name) => name.as_str(),
            other => {
                return Err(self.declaration(DeclarationError::NotAnArray {
                    name: other.to_string(),
                }))
            }
        };
        self.array_named(name).map(|(slot, elem)| (slot, elem, name))
    }

    fn array_named(&self, name: &str) -> Result<(SlotId, ScalarType), VerifyError> {
        match self.symbols.lookup(name) {
            None => Err(self.undeclared(name)),
            Some((slot, VarType::Array { elem, .. })) => Ok((slot, elem)),
            Some((_, VarType::Scalar(_))) => Err(self.declaration(DeclarationError::NotAnArray {
                name: name.to_string(),
            })),
        }
    }

    /// `A[i]` / `A[3]` index part.
    fn index(&self, array: &str, index: &Index) -> Result<IndexSrc, VerifyError> {
        match index {
            Index::Int(n) => Ok(IndexSrc::Const(*n)),
            Index::Var(name) => {
                let (slot, ty) = self.scalar(name)?;
                if ty != ScalarType::Int {
                    return Err(self.type_error(TypeError::NonIntIndex {
                        array: array.to_string(),
                        found: ty,
                    }));
                }
                Ok(IndexSrc::Slot(slot))
            }
        }
    }

    /// Third operand of `array_load` / `array_store`.
    fn index_src(&self, array: &str, operand: &Operand) -> Result<Src, VerifyError> {
        let (src, ty) = self.src(operand)?;
        if ty != ScalarType::Int {
            return Err(self.type_error(TypeError::NonIntIndex {
                array: array.to_string(),
                found: ty,
            }));
        }
        Ok(src)
    }

    /// A readable scalar operand and its static type.
    fn src(&self, operand: &Operand) -> Result<(Src, ScalarType), VerifyError> {
        match operand {
            Operand::Int(n) => Ok((Src::Int(*n), ScalarType::Int)),
            Operand::Float(x) => Ok((Src::Float(*x), ScalarType::Float)),
            Operand::Var(name) => {
                let (slot, ty) = self.scalar(name)?;
                Ok((Src::Slot(slot), ty))
            }
            Operand::Element { array, index } => {
                let (slot, elem) = self.array_named(array)?;
                let index = self.index(array, index)?;
                Ok((Src::Element { array: slot, index }, elem))
            }
            Operand::Label(name) | Operand::Function(name) => Err(self.undeclared(name)),
        }
    }

    /// A writable operand, its type, and its name for diagnostics.
    fn place(&self, operand: &Operand) -> Result<(Place, ScalarType, String), VerifyError> {
        match operand {
            Operand::Var(name) => {
                let (slot, ty) = self.scalar(name)?;
                Ok((Place::Slot(slot), ty, name.clone()))
            }
            Operand::Element { array, index } => {
                let (slot, elem) = self.array_named(array)?;
                let index = self.index(array, index)?;
                Ok((Place::Element { array: slot, index }, elem, operand.to_string()))
            }
            other => Err(self.declaration(DeclarationError::NotAssignable {
                operand: other.to_string(),
            })),
        }
    }

    fn label(&self, operand: &Operand) -> Result<usize, VerifyError> {
        match operand {
            Operand::Label(name) => self.labels.get(name).copied().ok_or_else(|| {
                self.declaration(DeclarationError::UnresolvedLabel {
                    label: name.clone(),
                })
            }),
            other => Err(self.declaration(DeclarationError::UnresolvedLabel {
                label: other.to_string(),
            })),
        }
    }

    fn function_name<'o>(&self, operand: &'o Operand) -> Result<&'o str, VerifyError> {
        match operand {
            Operand::Function(name) => Ok(name),
            other => Err(self.declaration(DeclarationError::UnknownFunction {
                name: other.to_string(),
            })),
        }
    }
}
