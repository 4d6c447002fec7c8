//! Symbol & declaration resolution.
//!
//! Builds the per-function name table from parameters and the
//! `int-list:`/`float-list:` declarations. Parameters, scalars and arrays
//! share one namespace. Slot ids follow declaration order: parameters
//! first, then ints, then floats.

use std::collections::HashMap;

use crate::error::{DeclarationError, Location, VerifyError};
use tac_common::executable::{Slot, SlotId};
use tac_common::{Function, VarType};

/// Name → slot table for one function.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    slots: Vec<Slot>,
    by_name: HashMap<String, SlotId>,
}

impl SymbolTable {
    /// Resolve a name to its slot.
    pub fn lookup(&self, name: &str) -> Option<(SlotId, VarType)> {
        self.by_name
            .get(name)
            .map(|&id| (id, self.slots[id].ty))
    }

    /// Slot ids of the parameters, in order.
    pub fn params(&self) -> Vec<SlotId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.param)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn into_slots(self) -> Vec<Slot> {
        self.slots
    }

    fn insert(&mut self, slot: Slot) -> Result<(), DeclarationError> {
        if self.by_name.contains_key(&slot.name) {
            return Err(DeclarationError::DuplicateName { name: slot.name });
        }
        self.by_name.insert(slot.name.clone(), self.slots.len());
        self.slots.push(slot);
        Ok(())
    }
}

/// Build the symbol table for `function`.
pub fn resolve_symbols(function: &Function) -> Result<SymbolTable, VerifyError> {
    let mut table = SymbolTable::default();

    let params = function
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.ty, true, function.line));
    let decls = function
        .decls()
        .map(|d| (d.name.as_str(), d.var_type(), false, d.line));

    for (name, ty, param, line) in params.chain(decls) {
        let at = Location::at(&function.name, line);
        if let VarType::Array { len: 0, .. } = ty {
            return Err(VerifyError::declaration(
                at,
                DeclarationError::ZeroLengthArray {
                    name: name.to_string(),
                },
            ));
        }
        table
            .insert(Slot {
                name: name.to_string(),
                ty,
                param,
            })
            .map_err(|e| VerifyError::declaration(at, e))?;
    }

    Ok(table)
}
