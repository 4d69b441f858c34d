//! Instruction decoder for AMF+1.
//!
//! Every 16-bit word decodes to some instruction: the opcode field is 4 bits
//! wide and all 16 values are assigned. Field layouts live in
//! [`crate::isa::layout`].

use crate::isa::{layout, Opcode, OperandClass};
use serde::{Serialize, Deserialize};

/// A source operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    /// Register slot (0-7).
    Register(u8),
    /// Unsigned constant embedded in the word.
    Immediate(u16),
}

/// Decoded AMF+1 instruction.
///
/// Register fields are raw 3-bit slot numbers. Slots 6 and 7 exist in the
/// register file but have no mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// No operation
    Nop,

    // ==================== ALU ====================

    /// dst := dst + src
    Add { src: Source, dst: u8 },
    /// dst := dst - src
    Sub { src: Source, dst: u8 },
    /// dst := dst * src
    Mult { src: Source, dst: u8 },
    /// cx := dst % src, then dst := dst / src
    Div { src: Source, dst: u8 },
    /// dst := src
    Mov { src: Source, dst: u8 },

    // ==================== Memory ====================

    /// [sp++] := src
    Push { src: Source },
    /// dst := [--sp]
    Pop { dst: u8 },
    /// dst := [ma]
    Load { dst: u8 },
    /// [ma] := src
    Store { src: Source },

    // ==================== Control Flow ====================

    /// pc := target
    Jmp { target: u16 },
    /// if cx != 0 then pc := target
    Jnz { target: u16 },
    /// if cx == 0 then pc := target
    Jz { target: u16 },
    /// if cx < 0 then pc := target
    Jn { target: u16 },
    /// Push pc, then pc := target
    Call { target: u16 },
    /// Pop pc
    Ret,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Nop => Opcode::Nop,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Sub { .. } => Opcode::Sub,
            Instruction::Mult { .. } => Opcode::Mult,
            Instruction::Div { .. } => Opcode::Div,
            Instruction::Mov { .. } => Opcode::Mov,
            Instruction::Push { .. } => Opcode::Push,
            Instruction::Pop { .. } => Opcode::Pop,
            Instruction::Load { .. } => Opcode::Load,
            Instruction::Store { .. } => Opcode::Store,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jnz { .. } => Opcode::Jnz,
            Instruction::Jz { .. } => Opcode::Jz,
            Instruction::Jn { .. } => Opcode::Jn,
            Instruction::Call { .. } => Opcode::Call,
            Instruction::Ret => Opcode::Ret,
        }
    }
}

/// Decode the 8-bit source of an ALU or `mov` word.
fn decode_source8(word: u16) -> Source {
    if layout::has_register_source(word) {
        Source::Register(layout::source_register(word))
    } else {
        Source::Immediate(layout::source8(word))
    }
}

/// Decode the 11-bit source of a `push` or `store` word.
fn decode_source11(word: u16) -> Source {
    if layout::has_register_source(word) {
        Source::Register(layout::source_register(word))
    } else {
        Source::Immediate(layout::source11(word))
    }
}

/// Decode a 16-bit instruction word.
pub fn decode(word: u16) -> Instruction {
    let opcode = layout::opcode(word);

    match opcode.class() {
        OperandClass::None => match opcode {
            Opcode::Ret => Instruction::Ret,
            _ => Instruction::Nop,
        },
        OperandClass::SourceDest => {
            let src = decode_source8(word);
            let dst = layout::dest(word);
            match opcode {
                Opcode::Add => Instruction::Add { src, dst },
                Opcode::Sub => Instruction::Sub { src, dst },
                Opcode::Mult => Instruction::Mult { src, dst },
                Opcode::Div => Instruction::Div { src, dst },
                _ => Instruction::Mov { src, dst },
            }
        }
        OperandClass::Source => {
            let src = decode_source11(word);
            match opcode {
                Opcode::Push => Instruction::Push { src },
                _ => Instruction::Store { src },
            }
        }
        OperandClass::Dest => {
            let dst = layout::dest(word);
            match opcode {
                Opcode::Pop => Instruction::Pop { dst },
                _ => Instruction::Load { dst },
            }
        }
        OperandClass::Target => {
            let target = layout::target(word);
            match opcode {
                Opcode::Jmp => Instruction::Jmp { target },
                Opcode::Jnz => Instruction::Jnz { target },
                Opcode::Jz => Instruction::Jz { target },
                Opcode::Jn => Instruction::Jn { target },
                _ => Instruction::Call { target },
            }
        }
    }
}

fn encode_source8(src: Source) -> u16 {
    match src {
        Source::Register(r) => layout::REGISTER_FLAG | ((r as u16 & layout::DEST_MASK) << layout::SOURCE_SHIFT),
        Source::Immediate(v) => (v << layout::SOURCE_SHIFT) & layout::SOURCE8_MASK,
    }
}

fn encode_source11(src: Source) -> u16 {
    match src {
        Source::Register(r) => layout::REGISTER_FLAG | ((r as u16 & layout::DEST_MASK) << layout::SOURCE_SHIFT),
        Source::Immediate(v) => v & layout::SOURCE11_MASK,
    }
}

/// Encode an instruction back to a 16-bit word.
///
/// Out-of-range immediates are truncated to their field; the assembler is
/// responsible for rejecting them first.
pub fn encode(instr: &Instruction) -> u16 {
    let op = instr.opcode().value() << layout::OPCODE_SHIFT;
    let dest = |dst: u8| dst as u16 & layout::DEST_MASK;

    let operands = match *instr {
        Instruction::Nop | Instruction::Ret => 0,
        Instruction::Add { src, dst }
        | Instruction::Sub { src, dst }
        | Instruction::Mult { src, dst }
        | Instruction::Div { src, dst }
        | Instruction::Mov { src, dst } => encode_source8(src) | dest(dst),
        Instruction::Push { src } | Instruction::Store { src } => encode_source11(src),
        Instruction::Pop { dst } | Instruction::Load { dst } => layout::REGISTER_FLAG | dest(dst),
        Instruction::Jmp { target }
        | Instruction::Jnz { target }
        | Instruction::Jz { target }
        | Instruction::Jn { target }
        | Instruction::Call { target } => target & layout::TARGET_MASK,
    };

    op | operands
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_nop_and_ret() {
        assert_eq!(decode(0x0000), Instruction::Nop);
        assert_eq!(decode(0xF000), Instruction::Ret);
    }

    #[test]
    fn test_decode_alu_forms() {
        // add 3 ax
        assert_eq!(
            decode(0x1018),
            Instruction::Add { src: Source::Immediate(3), dst: 0 }
        );
        // sub bx cx
        assert_eq!(
            decode(0x2800 | (1 << 3) | 2),
            Instruction::Sub { src: Source::Register(1), dst: 2 }
        );
    }

    #[test]
    fn test_decode_push_forms() {
        assert_eq!(decode(0x5000 | 2047), Instruction::Push { src: Source::Immediate(2047) });
        assert_eq!(decode(0x5800 | (4 << 3)), Instruction::Push { src: Source::Register(4) });
    }

    #[test]
    fn test_decode_branch_target() {
        assert_eq!(decode(0xA00C), Instruction::Jmp { target: 12 });
        assert_eq!(decode(0xEFFF), Instruction::Call { target: 4095 });
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let test_cases = [
            Instruction::Nop,
            Instruction::Ret,
            Instruction::Mov { src: Source::Immediate(255), dst: 5 },
            Instruction::Div { src: Source::Register(3), dst: 1 },
            Instruction::Store { src: Source::Immediate(1000) },
            Instruction::Push { src: Source::Register(0) },
            Instruction::Load { dst: 2 },
            Instruction::Jn { target: 1 },
        ];

        for instr in test_cases {
            assert_eq!(decode(encode(&instr)), instr, "roundtrip of {:?}", instr);
        }
    }

    proptest! {
        #[test]
        fn prop_every_word_decodes_to_its_opcode(word in any::<u16>()) {
            prop_assert_eq!(decode(word).opcode(), layout::opcode(word));
        }

        #[test]
        fn prop_alu_immediate_roundtrip(value in 0u16..256, dst in 0u8..8) {
            let instr = Instruction::Mult { src: Source::Immediate(value), dst };
            prop_assert_eq!(decode(encode(&instr)), instr);
        }

        #[test]
        fn prop_store_immediate_roundtrip(value in 0u16..2048) {
            let instr = Instruction::Store { src: Source::Immediate(value) };
            prop_assert_eq!(decode(encode(&instr)), instr);
        }

        #[test]
        fn prop_target_roundtrip(target in 0u16..4096) {
            let instr = Instruction::Jz { target };
            prop_assert_eq!(decode(encode(&instr)), instr);
        }
    }
}
