//! Control-flow resolution.
//!
//! Two passes per function: build the whole label table first, then check
//! every `goto` and branch target against it.

use std::collections::HashMap;

use crate::error::{DeclarationError, Location, VerifyError};
use tac_common::{Function, Operand};

/// Build the label table for `function` and resolve every transfer target.
///
/// A label may map to `instructions.len()` when it ends the body.
pub fn resolve_labels(function: &Function) -> Result<HashMap<String, usize>, VerifyError> {
    let mut table: HashMap<String, usize> = HashMap::new();
    let mut first_line: HashMap<&str, usize> = HashMap::new();

    for label in &function.labels {
        if let Some(&line) = first_line.get(label.name.as_str()) {
            return Err(VerifyError::declaration(
                Location::at(&function.name, label.line),
                DeclarationError::DuplicateLabel {
                    label: label.name.clone(),
                    first_line: line,
                },
            ));
        }
        first_line.insert(&label.name, label.line);
        table.insert(label.name.clone(), label.at);
    }

    for instr in &function.instructions {
        if !instr.opcode.is_control_transfer() {
            continue;
        }
        if let Some(Operand::Label(target)) = instr.operands.first() {
            if !table.contains_key(target) {
                return Err(VerifyError::declaration(
                    Location::at(&function.name, instr.line),
                    DeclarationError::UnresolvedLabel {
                        label: target.clone(),
                    },
                ));
            }
        }
    }

    Ok(table)
}
