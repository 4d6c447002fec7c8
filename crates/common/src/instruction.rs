//! Instructions and their operands, as written in program text.

use std::fmt;

use crate::opcode::Opcode;
use crate::value::format_float;

/// Index expression inside `name[...]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Index {
    /// Index held in a variable.
    Var(String),
    /// Literal index.
    Int(i32),
}

/// A single instruction operand.
///
/// The parser decides between `Var`, `Label` and `Function` from the
/// opcode's operand position; the verifier resolves names.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A variable reference (scalar, or an array name where one is expected).
    Var(String),
    /// An indexed array element, `A[i]`.
    Element { array: String, index: Index },
    /// Integer literal.
    Int(i32),
    /// Float literal.
    Float(f32),
    /// Label reference (control-transfer target).
    Label(String),
    /// Function or intrinsic reference.
    Function(String),
}

impl Operand {
    /// The referenced variable name, for `Var` and `Element` operands.
    pub fn var_name(&self) -> Option<&str> {
        match self {
            Operand::Var(name) => Some(name),
            Operand::Element { array, .. } => Some(array),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Operand::Int(_) | Operand::Float(_))
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Var(name) => f.write_str(name),
            Index::Int(n) => write!(f, "{n}"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(name) | Operand::Label(name) | Operand::Function(name) => {
                f.write_str(name)
            }
            Operand::Element { array, index } => write!(f, "{array}[{index}]"),
            Operand::Int(n) => write!(f, "{n}"),
            Operand::Float(x) => f.write_str(&format_float(*x)),
        }
    }
}

/// One instruction: opcode, ordered operands, and the source line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    /// 1-based source line (0 when built programmatically).
    pub line: usize,
}

impl Instruction {
    /// Create a new instruction.
    pub fn new(opcode: Opcode, operands: Vec<Operand>, line: usize) -> Self {
        Self {
            opcode,
            operands,
            line,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        for op in &self.operands {
            write!(f, ", {op}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_three_address() {
        let instr = Instruction::new(
            Opcode::Add,
            vec![
                Operand::Var("i".to_string()),
                Operand::Var("i".to_string()),
                Operand::Int(1),
            ],
            0,
        );
        assert_eq!(instr.to_string(), "add, i, i, 1");
    }

    #[test]
    fn display_return_without_value() {
        let instr = Instruction::new(Opcode::Return, vec![], 0);
        assert_eq!(instr.to_string(), "return");
    }

    #[test]
    fn display_element_and_float() {
        let instr = Instruction::new(
            Opcode::Assign,
            vec![
                Operand::Element {
                    array: "B".to_string(),
                    index: Index::Var("k".to_string()),
                },
                Operand::Float(2.5),
            ],
            0,
        );
        assert_eq!(instr.to_string(), "assign, B[k], 2.5");
    }

    #[test]
    fn var_name_of_operands() {
        assert_eq!(Operand::Var("x".to_string()).var_name(), Some("x"));
        assert_eq!(Operand::Int(3).var_name(), None);
        assert_eq!(Operand::Label("end".to_string()).var_name(), None);
        assert!(Operand::Float(1.0).is_literal());
    }
}
