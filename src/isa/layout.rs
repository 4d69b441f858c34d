//! Bit layout of an AMF+1 instruction word.
//!
//! ```text
//!  15  12  11  10          3  2   0
//! +------+---+-------------+-----+
//! |  op  | i |     src     | dst |   add, sub, mult, div, mov
//! +------+---+-------------+-----+
//! |  op  | i |   11-bit immediate |   push, store (register in bits 5..3)
//! +------+---+-------------------+
//! |  op  |        unused     | dst |   pop, load
//! +------+-------------------+-----+
//! |  op  |   12-bit target address |   jmp, jnz, jz, jn, call
//! +------+-------------------------+
//! ```
//!
//! `i` is 1 when the source is a register.

use crate::isa::Opcode;

pub const OPCODE_SHIFT: u16 = 12;

/// Set when the source operand is a register.
pub const REGISTER_FLAG: u16 = 0x0800;

/// 8-bit source field (bits 10..3).
pub const SOURCE8_MASK: u16 = 0x07F8;
pub const SOURCE_SHIFT: u16 = 3;

/// 11-bit immediate field (bits 10..0).
pub const SOURCE11_MASK: u16 = 0x07FF;

/// 12-bit control-transfer target (bits 11..0).
pub const TARGET_MASK: u16 = 0x0FFF;

/// Destination register field (bits 2..0).
pub const DEST_MASK: u16 = 0x0007;

/// Exclusive upper bounds for immediates in each field.
pub const IMM8_LIMIT: u32 = 1 << 8;
pub const IMM11_LIMIT: u32 = 1 << 11;
pub const IMM12_LIMIT: u32 = 1 << 12;

#[inline]
pub const fn opcode(word: u16) -> Opcode {
    Opcode::from_bits(word >> OPCODE_SHIFT)
}

#[inline]
pub const fn has_register_source(word: u16) -> bool {
    word & REGISTER_FLAG != 0
}

/// Raw 8-bit source field, as an immediate (0-255).
#[inline]
pub const fn source8(word: u16) -> u16 {
    (word & SOURCE8_MASK) >> SOURCE_SHIFT
}

/// Raw 11-bit source field, as an immediate (0-2047).
#[inline]
pub const fn source11(word: u16) -> u16 {
    word & SOURCE11_MASK
}

/// Register index of a register source. Both source classes keep it in bits 5..3.
#[inline]
pub const fn source_register(word: u16) -> u8 {
    ((word >> SOURCE_SHIFT) & DEST_MASK) as u8
}

#[inline]
pub const fn dest(word: u16) -> u8 {
    (word & DEST_MASK) as u8
}

#[inline]
pub const fn target(word: u16) -> u16 {
    word & TARGET_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_extraction() {
        // add 255 cx
        let word = (1 << OPCODE_SHIFT) | (255 << SOURCE_SHIFT) | 2;
        assert_eq!(opcode(word), Opcode::Add);
        assert!(!has_register_source(word));
        assert_eq!(source8(word), 255);
        assert_eq!(dest(word), 2);
    }

    #[test]
    fn test_register_source_field() {
        // push ma
        let word = (5 << OPCODE_SHIFT) | REGISTER_FLAG | (5 << SOURCE_SHIFT);
        assert_eq!(opcode(word), Opcode::Push);
        assert!(has_register_source(word));
        assert_eq!(source_register(word), 5);
    }

    #[test]
    fn test_target_field_uses_twelve_bits() {
        let word = (10 << OPCODE_SHIFT) | 0x0FFF;
        assert_eq!(opcode(word), Opcode::Jmp);
        assert_eq!(target(word), 4095);
        assert_eq!(source11(word), 2047);
    }
}
