//! Common types for the three-address-code (TAC) toolchain.
//!
//! This crate provides the data structures shared by the assembler,
//! verifier and VM:
//!
//! - [`Opcode`] — the closed instruction set
//! - [`ScalarType`], [`VarType`], [`ReturnType`] — the type model
//! - [`Operand`], [`Instruction`] — instructions as written in text
//! - [`Function`], [`Program`] — parsed program structure
//! - [`Value`] — runtime scalar values
//! - [`Executable`] — the verified, index-resolved form the VM runs
//! - [`TypeError`] — type errors raised statically or defensively at runtime

pub mod error;
pub mod executable;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod types;
pub mod value;

// Re-export commonly used types at the crate root.
pub use error::TypeError;
pub use executable::{Executable, Intrinsic, Routine};
pub use instruction::{Index, Instruction, Operand};
pub use opcode::Opcode;
pub use program::{Decl, Function, LabelDef, Param, Program};
pub use types::{ReturnType, ScalarType, VarType};
pub use value::Value;
