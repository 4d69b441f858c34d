//! Register table.

use std::fmt;
use serde::{Serialize, Deserialize};

/// Number of register slots in the register file.
///
/// A 3-bit register field can name 8 slots; only the first 6 have names.
pub const REGISTER_SLOTS: usize = 8;

/// A software-visible register.
///
/// The program counter and instruction register are internal and have no
/// encoding, so they are not listed here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Register {
    /// Accumulator
    Ax = 0,
    /// Alternate accumulator
    Bx = 1,
    /// Counter; tested by every conditional branch and receives `div` remainders
    Cx = 2,
    /// Stack pointer
    Sp = 3,
    /// Stack base
    Bp = 4,
    /// Memory address; the only way to address RAM
    Ma = 5,
}

impl Register {
    pub const ALL: [Register; 6] = [
        Register::Ax, Register::Bx, Register::Cx,
        Register::Sp, Register::Bp, Register::Ma,
    ];

    pub const MNEMONICS: [&'static str; 6] = ["ax", "bx", "cx", "sp", "bp", "ma"];

    pub fn from_mnemonic(text: &str) -> Option<Self> {
        Self::MNEMONICS
            .iter()
            .position(|&m| m == text)
            .map(|i| Self::ALL[i])
    }

    /// Register for a field value, if that slot has a name.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn mnemonic(self) -> &'static str {
        Self::MNEMONICS[self as usize]
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_lookup() {
        assert_eq!(Register::from_mnemonic("ax"), Some(Register::Ax));
        assert_eq!(Register::from_mnemonic("ma"), Some(Register::Ma));
        assert_eq!(Register::from_mnemonic("pc"), None);
        assert_eq!(Register::from_mnemonic("ir"), None);
    }

    #[test]
    fn test_index_roundtrip() {
        for reg in Register::ALL {
            assert_eq!(Register::from_index(reg.index()), Some(reg));
        }
        assert_eq!(Register::from_index(6), None);
        assert_eq!(Register::from_index(7), None);
    }
}
