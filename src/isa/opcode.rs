//! Opcode table.
//!
//! The opcode of each instruction is its index in the mnemonic table, so
//! the table order is part of the binary format.

use std::fmt;
use serde::{Serialize, Deserialize};

/// One of the 16 AMF+1 operations, stored in bits 15..12 of a word.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    Add = 1,
    Sub = 2,
    Mult = 3,
    Div = 4,
    Push = 5,
    Pop = 6,
    Mov = 7,
    Load = 8,
    Store = 9,
    Jmp = 10,
    Jnz = 11,
    Jz = 12,
    Jn = 13,
    Call = 14,
    Ret = 15,
}

/// How the 12 bits below the opcode are used.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandClass {
    /// No operand bits (`nop`, `ret`).
    None,
    /// Register flag, 8-bit source, 3-bit destination (`add`..`div`, `mov`).
    SourceDest,
    /// Register flag, 11-bit immediate or register in bits 5..3 (`push`, `store`).
    Source,
    /// 3-bit destination only (`pop`, `load`).
    Dest,
    /// 12-bit code address (`jmp`, `jnz`, `jz`, `jn`, `call`).
    Target,
}

impl Opcode {
    /// All opcodes, indexed by their numeric value.
    pub const ALL: [Opcode; 16] = [
        Opcode::Nop, Opcode::Add, Opcode::Sub, Opcode::Mult,
        Opcode::Div, Opcode::Push, Opcode::Pop, Opcode::Mov,
        Opcode::Load, Opcode::Store, Opcode::Jmp, Opcode::Jnz,
        Opcode::Jz, Opcode::Jn, Opcode::Call, Opcode::Ret,
    ];

    /// Mnemonics, indexed by numeric value.
    pub const MNEMONICS: [&'static str; 16] = [
        "nop", "add", "sub", "mult", "div", "push", "pop", "mov",
        "load", "store", "jmp", "jnz", "jz", "jn", "call", "ret",
    ];

    /// Opcode for a 4-bit value. Higher bits are ignored.
    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        Self::ALL[(bits & 0xF) as usize]
    }

    /// Numeric value (0-15).
    #[inline]
    pub const fn value(self) -> u16 {
        self as u16
    }

    /// Look up a mnemonic. Matching is exact: `ADD` is not `add`.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        Self::MNEMONICS
            .iter()
            .position(|&m| m == text)
            .map(|i| Self::ALL[i])
    }

    #[inline]
    pub const fn mnemonic(self) -> &'static str {
        Self::MNEMONICS[self as usize]
    }

    /// The encoding class of this opcode's operand field.
    pub const fn class(self) -> OperandClass {
        match self {
            Opcode::Nop | Opcode::Ret => OperandClass::None,
            Opcode::Add | Opcode::Sub | Opcode::Mult | Opcode::Div | Opcode::Mov => {
                OperandClass::SourceDest
            }
            Opcode::Push | Opcode::Store => OperandClass::Source,
            Opcode::Pop | Opcode::Load => OperandClass::Dest,
            Opcode::Jmp | Opcode::Jnz | Opcode::Jz | Opcode::Jn | Opcode::Call => {
                OperandClass::Target
            }
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_values() {
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(op.value() as usize, i);
            assert_eq!(Opcode::from_bits(i as u16), *op);
        }
    }

    #[test]
    fn test_mnemonic_roundtrip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("mult"), Some(Opcode::Mult));
        assert_eq!(Opcode::from_mnemonic("MOV"), None);
        assert_eq!(Opcode::from_mnemonic("halt"), None);
    }

    #[test]
    fn test_operand_classes() {
        assert_eq!(Opcode::Nop.class(), OperandClass::None);
        assert_eq!(Opcode::Ret.class(), OperandClass::None);
        assert_eq!(Opcode::Mov.class(), OperandClass::SourceDest);
        assert_eq!(Opcode::Store.class(), OperandClass::Source);
        assert_eq!(Opcode::Load.class(), OperandClass::Dest);
        assert_eq!(Opcode::Call.class(), OperandClass::Target);
    }
}
