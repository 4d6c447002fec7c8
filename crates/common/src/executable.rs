//! Verified, lowered program form consumed by the VM.
//!
//! The verifier produces an [`Executable`] only after every name, label and
//! call site has been resolved, so the VM works entirely with indices:
//! local slots, instruction indices, and routine indices. An `Executable`
//! is immutable and can be shared across any number of runs.

use std::collections::HashMap;

use crate::types::{ReturnType, ScalarType, VarType};

/// Index of a local slot within a routine.
pub type SlotId = usize;

/// A local slot: parameter, scalar, or array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub ty: VarType,
    /// True for parameters (bound from call arguments).
    pub param: bool,
}

/// Index expression inside an element reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSrc {
    Slot(SlotId),
    Const(i32),
}

/// A readable scalar operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Src {
    Slot(SlotId),
    Element { array: SlotId, index: IndexSrc },
    Int(i32),
    Float(f32),
}

/// A writable scalar location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    Slot(SlotId),
    Element { array: SlotId, index: IndexSrc },
}

/// A call argument: a scalar value, or an array passed by reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg {
    Value(Src),
    Array(SlotId),
}

/// Built-in I/O callees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Geti,
    Getf,
    Getc,
    Puti,
    Putf,
    Putc,
}

/// All intrinsics, in definition order.
pub const ALL_INTRINSICS: [Intrinsic; 6] = [
    Intrinsic::Geti,
    Intrinsic::Getf,
    Intrinsic::Getc,
    Intrinsic::Puti,
    Intrinsic::Putf,
    Intrinsic::Putc,
];

impl Intrinsic {
    pub fn name(&self) -> &'static str {
        match self {
            Intrinsic::Geti => "geti",
            Intrinsic::Getf => "getf",
            Intrinsic::Getc => "getc",
            Intrinsic::Puti => "puti",
            Intrinsic::Putf => "putf",
            Intrinsic::Putc => "putc",
        }
    }

    pub fn from_name(name: &str) -> Option<Intrinsic> {
        ALL_INTRINSICS.iter().find(|i| i.name() == name).copied()
    }

    /// Parameter types, in order.
    pub fn params(&self) -> &'static [ScalarType] {
        match self {
            Intrinsic::Geti | Intrinsic::Getf | Intrinsic::Getc => &[],
            Intrinsic::Puti | Intrinsic::Putc => &[ScalarType::Int],
            Intrinsic::Putf => &[ScalarType::Float],
        }
    }

    pub fn return_type(&self) -> ReturnType {
        match self {
            Intrinsic::Geti | Intrinsic::Getc => ReturnType::Scalar(ScalarType::Int),
            Intrinsic::Getf => ReturnType::Scalar(ScalarType::Float),
            Intrinsic::Puti | Intrinsic::Putf | Intrinsic::Putc => ReturnType::Void,
        }
    }
}

/// Resolved call target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee {
    Routine(usize),
    Intrinsic(Intrinsic),
}

/// `add`, `sub`, `mult`, `div`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mult,
    Div,
}

/// `and`, `or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
}

impl BitOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BitOp::And => "and",
            BitOp::Or => "or",
        }
    }
}

/// Branch condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Neq,
    Lt,
    Gt,
    Geq,
    Leq,
}

impl Cond {
    /// Evaluate the condition on two already-widened operands.
    pub fn holds<T: PartialOrd>(self, a: T, b: T) -> bool {
        match self {
            Cond::Eq => a == b,
            Cond::Neq => a != b,
            Cond::Lt => a < b,
            Cond::Gt => a > b,
            Cond::Geq => a >= b,
            Cond::Leq => a <= b,
        }
    }
}

/// One resolved operation; one variant per row of the opcode table.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Assign {
        dest: Place,
        src: Src,
    },
    Arith {
        op: ArithOp,
        dest: Place,
        lhs: Src,
        rhs: Src,
    },
    Bitwise {
        op: BitOp,
        dest: Place,
        lhs: Src,
        rhs: Src,
    },
    Goto {
        target: usize,
    },
    Branch {
        cond: Cond,
        target: usize,
        lhs: Src,
        rhs: Src,
    },
    Return {
        value: Option<Src>,
    },
    Call {
        callee: Callee,
        args: Vec<Arg>,
    },
    Callr {
        dest: Place,
        callee: Callee,
        args: Vec<Arg>,
    },
    ArrayLoad {
        dest: Place,
        array: SlotId,
        index: Src,
    },
    ArrayStore {
        value: Src,
        array: SlotId,
        index: Src,
    },
}

/// An operation plus the source line it was lowered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub op: Op,
    pub line: usize,
}

/// A verified function.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    pub name: String,
    pub return_type: ReturnType,
    /// Slot ids of the parameters, in declaration order.
    pub params: Vec<SlotId>,
    pub slots: Vec<Slot>,
    pub code: Vec<Step>,
    /// Label table, label → instruction index.
    pub labels: HashMap<String, usize>,
}

impl Routine {
    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id]
    }
}

/// A verified program ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Executable {
    pub routines: Vec<Routine>,
    /// Index of `main` in `routines`.
    pub entry: usize,
}

impl Executable {
    pub fn routine(&self, name: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.name == name)
    }
}
