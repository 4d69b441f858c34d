//! Disassembler for AMF+1 programs.
//!
//! Converts instruction words back to assembly text, and renders the
//! machine status line used by trace mode.

use crate::cpu::decode::{decode, Instruction, Source};
use crate::cpu::memory::STACK_SEGMENT;
use crate::cpu::Cpu;
use crate::isa::Register;

/// Disassemble a single instruction to text.
pub fn disassemble_instruction(word: u16) -> String {
    format_instruction(&decode(word))
}

/// Disassemble a slice of instructions loaded at `origin`.
pub fn disassemble(words: &[u16], origin: u16) -> String {
    let mut output = String::new();
    output.push_str("# AMF+1 Disassembly\n");
    output.push_str("# -----------------\n\n");

    for (i, &word) in words.iter().enumerate() {
        let addr = origin as usize + i;
        let line = disassemble_instruction(word);
        output.push_str(&format!("{:04}: {:<14} # 0x{:04X}\n", addr, line, word));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let op = instr.opcode();
    match *instr {
        Instruction::Nop | Instruction::Ret => op.to_string(),

        Instruction::Add { src, dst }
        | Instruction::Sub { src, dst }
        | Instruction::Mult { src, dst }
        | Instruction::Div { src, dst }
        | Instruction::Mov { src, dst } => {
            format!("{} {} {}", op, format_source(src), register_name(dst))
        }

        Instruction::Push { src } | Instruction::Store { src } => {
            format!("{} {}", op, format_source(src))
        }

        Instruction::Pop { dst } | Instruction::Load { dst } => {
            format!("{} {}", op, register_name(dst))
        }

        Instruction::Jmp { target }
        | Instruction::Jnz { target }
        | Instruction::Jz { target }
        | Instruction::Jn { target }
        | Instruction::Call { target } => format!("{} {}", op, target),
    }
}

fn format_source(src: Source) -> String {
    match src {
        Source::Register(r) => register_name(r),
        Source::Immediate(v) => v.to_string(),
    }
}

/// Register mnemonic; unnamed slots render as `r6` and `r7`.
pub fn register_name(index: u8) -> String {
    match Register::from_index(index) {
        Some(reg) => reg.mnemonic().to_string(),
        None => format!("r{}", index),
    }
}

/// One-line register and stack snapshot.
///
/// `sp`, `bp`, `ma`, and `pc` are shown unsigned since they hold addresses.
pub fn render_status(cpu: &Cpu) -> String {
    let regs = &cpu.regs;
    let sp = regs.sp();
    let mut status = format!(
        "ax={}, bx={}, cx={}, sp={}, bp={}, ma={}, pc={}",
        regs.read(Register::Ax),
        regs.read(Register::Bx),
        regs.cx(),
        sp as u16,
        regs.read(Register::Bp) as u16,
        regs.ma() as u16,
        regs.pc,
    );
    if sp > STACK_SEGMENT as i16 {
        status.push_str(&format!(", tos={}", cpu.mem.read(sp as usize - 1)));
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble_line;
    use crate::cpu::decode::encode;

    #[test]
    fn test_disassemble_nop_ret() {
        assert_eq!(disassemble_instruction(0x0000), "nop");
        assert_eq!(disassemble_instruction(0xF000), "ret");
    }

    #[test]
    fn test_disassemble_matches_source() {
        for line in [
            "add 3 ax", "sub ax bx", "mult 255 cx", "div bp ma", "mov sp ax",
            "push 2047", "push bx", "store 12", "store ma",
            "pop cx", "load bp",
            "jmp 1", "jnz 4095", "jz 77", "jn 8", "call 300",
        ] {
            let word = assemble_line(line).unwrap();
            assert_eq!(disassemble_instruction(word), line);
        }
    }

    #[test]
    fn test_unnamed_register_slots() {
        let word = encode(&Instruction::Mov { src: Source::Register(6), dst: 7 });
        assert_eq!(disassemble_instruction(word), "mov r6 r7");
    }

    #[test]
    fn test_listing_has_addresses() {
        let listing = disassemble(&[0x1018, 0xF000], 1);
        assert!(listing.contains("0001: add 3 ax"));
        assert!(listing.contains("0002: ret"));
        assert!(listing.contains("0x1018"));
    }

    #[test]
    fn test_render_status() {
        let mut cpu = Cpu::new();
        assert_eq!(
            render_status(&cpu),
            "ax=0, bx=0, cx=0, sp=4096, bp=0, ma=0, pc=1"
        );

        cpu.regs.write(Register::Ax, -3);
        cpu.mem.write(4096, 55);
        cpu.regs.write(Register::Sp, 4097);
        assert_eq!(
            render_status(&cpu),
            "ax=-3, bx=0, cx=0, sp=4097, bp=0, ma=0, pc=1, tos=55"
        );
    }
}
