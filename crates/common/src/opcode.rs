//! Opcode definitions for the three-address-code instruction set.
//!
//! The set is closed: every mnemonic the text format accepts has exactly one
//! variant here, and nothing else is an opcode.

/// Identifies the operation an instruction performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Data movement
    /// `assign, dest, src` — copy a value.
    Assign,

    // Arithmetic
    /// `add, dest, a, b`
    Add,
    /// `sub, dest, a, b`
    Sub,
    /// `mult, dest, a, b`
    Mult,
    /// `div, dest, a, b` — integer division truncates toward zero.
    Div,

    // Bitwise (int only)
    /// `and, dest, a, b`
    And,
    /// `or, dest, a, b`
    Or,

    // Control flow
    /// `goto, label`
    Goto,
    /// `breq, label, a, b`
    Breq,
    /// `brneq, label, a, b`
    Brneq,
    /// `brlt, label, a, b`
    Brlt,
    /// `brgt, label, a, b`
    Brgt,
    /// `brgeq, label, a, b`
    Brgeq,
    /// `brleq, label, a, b`
    Brleq,

    // Functions
    /// `return` or `return, value`
    Return,
    /// `call, func, args...` — result (if any) is discarded.
    Call,
    /// `callr, dest, func, args...`
    Callr,

    // Arrays
    /// `array_load, dest, array, index`
    ArrayLoad,
    /// `array_store, value, array, index`
    ArrayStore,
}

/// All opcodes, in definition order. Useful for exhaustive testing.
pub const ALL_OPCODES: [Opcode; 19] = [
    Opcode::Assign,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mult,
    Opcode::Div,
    Opcode::And,
    Opcode::Or,
    Opcode::Goto,
    Opcode::Breq,
    Opcode::Brneq,
    Opcode::Brlt,
    Opcode::Brgt,
    Opcode::Brgeq,
    Opcode::Brleq,
    Opcode::Return,
    Opcode::Call,
    Opcode::Callr,
    Opcode::ArrayLoad,
    Opcode::ArrayStore,
];

/// What a single operand position of an opcode expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// A writable scalar location (variable or indexed element).
    Dest,
    /// A readable scalar: variable, indexed element or literal.
    Value,
    /// A label name in the enclosing function.
    Label,
    /// A function (or intrinsic) name.
    Function,
    /// An array variable name.
    Array,
}

/// Number of operands an opcode accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many operands.
    Exact(usize),
    /// At least this many operands; the remainder are call arguments.
    AtLeast(usize),
    /// Either zero or one operand.
    Optional,
}

impl Opcode {
    /// Returns the text-format mnemonic for this opcode.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Assign => "assign",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mult => "mult",
            Opcode::Div => "div",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Goto => "goto",
            Opcode::Breq => "breq",
            Opcode::Brneq => "brneq",
            Opcode::Brlt => "brlt",
            Opcode::Brgt => "brgt",
            Opcode::Brgeq => "brgeq",
            Opcode::Brleq => "brleq",
            Opcode::Return => "return",
            Opcode::Call => "call",
            Opcode::Callr => "callr",
            Opcode::ArrayLoad => "array_load",
            Opcode::ArrayStore => "array_store",
        }
    }

    /// Look up an opcode by mnemonic. Mnemonics are case-sensitive.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        ALL_OPCODES
            .iter()
            .find(|op| op.mnemonic() == mnemonic)
            .copied()
    }

    /// Operand count accepted by this opcode.
    pub fn arity(&self) -> Arity {
        match self {
            Opcode::Assign => Arity::Exact(2),
            Opcode::Add | Opcode::Sub | Opcode::Mult | Opcode::Div | Opcode::And | Opcode::Or => {
                Arity::Exact(3)
            }
            Opcode::Goto => Arity::Exact(1),
            Opcode::Breq
            | Opcode::Brneq
            | Opcode::Brlt
            | Opcode::Brgt
            | Opcode::Brgeq
            | Opcode::Brleq => Arity::Exact(3),
            Opcode::Return => Arity::Optional,
            Opcode::Call => Arity::AtLeast(1),
            Opcode::Callr => Arity::AtLeast(2),
            Opcode::ArrayLoad | Opcode::ArrayStore => Arity::Exact(3),
        }
    }

    /// Kind expected at operand position `index`.
    ///
    /// Positions past the fixed prefix of `call`/`callr` are arguments and
    /// report [`OperandKind::Value`]; the call validator decides whether an
    /// argument must be an array.
    pub fn operand_kind(&self, index: usize) -> OperandKind {
        match (self, index) {
            (Opcode::Assign, 0) => OperandKind::Dest,
            (
                Opcode::Add | Opcode::Sub | Opcode::Mult | Opcode::Div | Opcode::And | Opcode::Or,
                0,
            ) => OperandKind::Dest,
            (Opcode::Goto, 0) => OperandKind::Label,
            (op, 0) if op.is_branch() => OperandKind::Label,
            (Opcode::Call, 0) => OperandKind::Function,
            (Opcode::Callr, 0) => OperandKind::Dest,
            (Opcode::Callr, 1) => OperandKind::Function,
            (Opcode::ArrayLoad, 0) => OperandKind::Dest,
            (Opcode::ArrayLoad | Opcode::ArrayStore, 1) => OperandKind::Array,
            _ => OperandKind::Value,
        }
    }

    /// True for the six conditional branches.
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            Opcode::Breq
                | Opcode::Brneq
                | Opcode::Brlt
                | Opcode::Brgt
                | Opcode::Brgeq
                | Opcode::Brleq
        )
    }

    /// True for opcodes that may redirect the program counter to a label.
    pub fn is_control_transfer(&self) -> bool {
        *self == Opcode::Goto || self.is_branch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_opcodes_count() {
        assert_eq!(ALL_OPCODES.len(), 19);
    }

    #[test]
    fn mnemonic_lookup_roundtrip() {
        for &opcode in &ALL_OPCODES {
            assert_eq!(
                Opcode::from_mnemonic(opcode.mnemonic()),
                Some(opcode),
                "lookup failed for {opcode:?}"
            );
        }
    }

    #[test]
    fn unknown_mnemonic() {
        assert_eq!(Opcode::from_mnemonic("mul"), None);
        assert_eq!(Opcode::from_mnemonic("ADD"), None);
        assert_eq!(Opcode::from_mnemonic("geti"), None);
    }

    #[test]
    fn branch_classification() {
        let branches: Vec<_> = ALL_OPCODES.iter().filter(|op| op.is_branch()).collect();
        assert_eq!(branches.len(), 6);
        assert!(Opcode::Goto.is_control_transfer());
        assert!(!Opcode::Goto.is_branch());
        assert!(!Opcode::Call.is_control_transfer());
    }

    #[test]
    fn operand_kinds() {
        assert_eq!(Opcode::Brlt.operand_kind(0), OperandKind::Label);
        assert_eq!(Opcode::Brlt.operand_kind(2), OperandKind::Value);
        assert_eq!(Opcode::Callr.operand_kind(0), OperandKind::Dest);
        assert_eq!(Opcode::Callr.operand_kind(1), OperandKind::Function);
        assert_eq!(Opcode::Callr.operand_kind(4), OperandKind::Value);
        assert_eq!(Opcode::ArrayStore.operand_kind(0), OperandKind::Value);
        assert_eq!(Opcode::ArrayStore.operand_kind(1), OperandKind::Array);
    }
}
