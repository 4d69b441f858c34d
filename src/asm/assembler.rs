//! Assembler for AMF+1 programs.
//!
//! Syntax, one instruction per line:
//! ```text
//! # Comment
//! mov 7 ax        # immediate source, register destination
//! add bx ax       # register source
//! push 1000       # 11-bit immediate
//! jnz 2           # 12-bit code address
//! ret
//! .               # end of program
//! ```
//!
//! Words are laid out per [`crate::isa::layout`].

use crate::asm::lexer::{Lexer, Token};
use crate::cpu::memory::{CODE_SIZE, PROGRAM_ORIGIN};
use crate::isa::layout::{
    IMM11_LIMIT, IMM12_LIMIT, IMM8_LIMIT, OPCODE_SHIFT, REGISTER_FLAG, SOURCE_SHIFT,
};
use crate::isa::{Opcode, OperandClass, Register};
use thiserror::Error;

/// Assemble source code to a list of instruction words.
///
/// Loading stops at the first line starting with `.`. Lines starting with
/// `#` and lines shorter than 3 characters are skipped.
pub fn assemble(source: &str) -> Result<Vec<u16>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// Assemble a single line to one instruction word.
pub fn assemble_line(line: &str) -> Result<u16, EncodeError> {
    LineEncoder::new(line).encode()
}

/// The assembler state.
struct Assembler {
    /// Output instructions.
    output: Vec<u16>,
}

impl Assembler {
    /// Words that fit between the load origin and the end of code.
    const CAPACITY: usize = (CODE_SIZE - PROGRAM_ORIGIN) as usize;

    fn new() -> Self {
        Self { output: Vec::new() }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u16>, AssemblerError> {
        for (line_num, line) in source.lines().enumerate() {
            if line.starts_with('.') {
                break;
            }
            self.process_line(line, line_num + 1)?;
        }

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        if is_skipped(line) {
            return Ok(());
        }

        let word = assemble_line(line).map_err(|e| e.at_line(line_num))?;
        if self.output.len() == Self::CAPACITY {
            return Err(AssemblerError::ProgramTooLarge {
                line: line_num,
                available: Self::CAPACITY,
            });
        }
        self.output.push(word);
        Ok(())
    }
}

/// Comment and blank-line rule of the loader.
fn is_skipped(line: &str) -> bool {
    line.len() < 3 || line.starts_with('#') || line.starts_with('\r') || line.starts_with('\n')
}

/// Encodes one line, pulling tokens from the lexer as needed.
struct LineEncoder<'a> {
    lexer: Lexer<'a>,
}

impl<'a> LineEncoder<'a> {
    fn new(line: &'a str) -> Self {
        Self { lexer: Lexer::new(line) }
    }

    fn encode(&mut self) -> Result<u16, EncodeError> {
        let opcode = self.opcode()?;
        let word = opcode.value() << OPCODE_SHIFT;
        let class = opcode.class();

        if class == OperandClass::None {
            return Ok(word);
        }

        let operands = match self.lexer.next_token() {
            Token::Number(value) => self.immediate_first(class, value)?,
            Token::Symbol(name) => {
                let reg = lookup_register(name)?;
                self.register_first(class, reg)?
            }
            Token::Stray(c) => return Err(OperandError::Unexpected(c).into()),
            Token::End => return Err(OperandError::Missing.into()),
        };

        Ok(word | operands)
    }

    fn opcode(&mut self) -> Result<Opcode, EncodeError> {
        let text = match self.lexer.next_token() {
            Token::Symbol(name) => {
                return Opcode::from_mnemonic(name)
                    .ok_or_else(|| EncodeError::IllegalOpcode(name.to_string()));
            }
            Token::Number(value) => value.to_string(),
            Token::Stray(c) => c.to_string(),
            Token::End => String::new(),
        };
        Err(EncodeError::IllegalOpcode(text))
    }

    fn immediate_first(&mut self, class: OperandClass, value: u32) -> Result<u16, EncodeError> {
        match class {
            OperandClass::SourceDest => {
                let imm = check_range(value, IMM8_LIMIT, 8)?;
                let dst = self.register()?;
                Ok((imm << SOURCE_SHIFT) | dst.index() as u16)
            }
            OperandClass::Source => check_range(value, IMM11_LIMIT, 11),
            // `pop` and `load` accept an immediate here too; only its low
            // three bits are ever read back.
            OperandClass::Dest | OperandClass::Target => check_range(value, IMM12_LIMIT, 12),
            OperandClass::None => Ok(0),
        }
    }

    fn register_first(&mut self, class: OperandClass, reg: Register) -> Result<u16, EncodeError> {
        let src = (reg.index() as u16) << SOURCE_SHIFT;
        match class {
            OperandClass::SourceDest => {
                let dst = self.register()?;
                Ok(REGISTER_FLAG | src | dst.index() as u16)
            }
            OperandClass::Source => Ok(REGISTER_FLAG | src),
            // The raw index lands in the low bits. For a branch this reads
            // back as code address 2048 + index.
            OperandClass::Dest | OperandClass::Target => Ok(REGISTER_FLAG | reg.index() as u16),
            OperandClass::None => Ok(0),
        }
    }

    /// The next token, which must name a register.
    fn register(&mut self) -> Result<Register, EncodeError> {
        match self.lexer.next_token() {
            Token::Symbol(name) => lookup_register(name),
            Token::Number(value) => Err(OperandError::ExpectedRegister(value.to_string()).into()),
            Token::Stray(c) => Err(OperandError::Unexpected(c).into()),
            Token::End => Err(OperandError::Missing.into()),
        }
    }
}

fn lookup_register(name: &str) -> Result<Register, EncodeError> {
    Register::from_mnemonic(name).ok_or_else(|| OperandError::UnknownRegister(name.to_string()).into())
}

fn check_range(value: u32, limit: u32, bits: u8) -> Result<u16, EncodeError> {
    if value >= limit {
        return Err(OperandError::OutOfRange { value, bits }.into());
    }
    Ok(value as u16)
}

/// Why an operand was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperandError {
    #[error("{value} does not fit in {bits} bits")]
    OutOfRange { value: u32, bits: u8 },

    #[error("unknown register {0:?}")]
    UnknownRegister(String),

    #[error("expected a register, found {0}")]
    ExpectedRegister(String),

    #[error("unexpected character {0:?}")]
    Unexpected(char),

    #[error("missing operand")]
    Missing,
}

/// Errors from encoding a single line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("Illegal Opcode {0:?}")]
    IllegalOpcode(String),

    #[error("Invalid Operand: {0}")]
    InvalidOperand(#[from] OperandError),
}

impl EncodeError {
    fn at_line(self, line: usize) -> AssemblerError {
        match self {
            EncodeError::IllegalOpcode(mnemonic) => AssemblerError::IllegalOpcode { line, mnemonic },
            EncodeError::InvalidOperand(reason) => AssemblerError::InvalidOperand { line, reason },
        }
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("Illegal Opcode, line {line}: {mnemonic:?}")]
    IllegalOpcode { line: usize, mnemonic: String },

    #[error("Invalid Operand, line {line}: {reason}")]
    InvalidOperand { line: usize, reason: OperandError },

    #[error("program exceeds the {available} words of code space, line {line}")]
    ProgramTooLarge { line: usize, available: usize },
}

impl AssemblerError {
    /// The 1-based source line that failed.
    pub fn line(&self) -> usize {
        match self {
            AssemblerError::IllegalOpcode { line, .. }
            | AssemblerError::InvalidOperand { line, .. }
            | AssemblerError::ProgramTooLarge { line, .. } => *line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{decode, Instruction, Source};

    fn out_of_range(value: u32, bits: u8) -> EncodeError {
        OperandError::OutOfRange { value, bits }.into()
    }

    #[test]
    fn test_no_operand_opcodes() {
        assert_eq!(assemble_line("nop"), Ok(0x0000));
        assert_eq!(assemble_line("ret"), Ok(0xF000));
        // trailing tokens are not read
        assert_eq!(assemble_line("ret 5"), Ok(0xF000));
    }

    #[test]
    fn test_alu_immediate() {
        assert_eq!(assemble_line("add 3 ax"), Ok(0x1018));
        assert_eq!(assemble_line("mov 255 ma"), Ok(0x7000 | (255 << 3) | 5));
    }

    #[test]
    fn test_alu_registers() {
        // sub ax bx: bx = bx - ax
        assert_eq!(assemble_line("sub ax bx"), Ok(0x2000 | 0x0800 | 1));
        assert_eq!(assemble_line("div bp cx"), Ok(0x4000 | 0x0800 | (4 << 3) | 2));
    }

    #[test]
    fn test_alu_boundaries() {
        for op in ["add", "sub", "mult", "div", "mov"] {
            assert!(assemble_line(&format!("{} 255 ax", op)).is_ok());
            assert_eq!(assemble_line(&format!("{} 256 ax", op)), Err(out_of_range(256, 8)));
        }
    }

    #[test]
    fn test_push_store_boundaries() {
        assert_eq!(assemble_line("push 2047"), Ok(0x57FF));
        assert_eq!(assemble_line("store 2047"), Ok(0x97FF));
        assert_eq!(assemble_line("push 2048"), Err(out_of_range(2048, 11)));
        assert_eq!(assemble_line("store 2048"), Err(out_of_range(2048, 11)));
    }

    #[test]
    fn test_twelve_bit_boundaries() {
        for op in ["jmp", "jnz", "jz", "jn", "call", "pop", "load"] {
            assert!(assemble_line(&format!("{} 4095", op)).is_ok(), "{} 4095", op);
            assert_eq!(assemble_line(&format!("{} 4096", op)), Err(out_of_range(4096, 12)));
        }
        assert_eq!(assemble_line("jmp 4095"), Ok(0xAFFF));
    }

    #[test]
    fn test_push_store_register() {
        assert_eq!(assemble_line("push bx"), Ok(0x5000 | 0x0800 | (1 << 3)));
        assert_eq!(assemble_line("store ma"), Ok(0x9000 | 0x0800 | (5 << 3)));
    }

    #[test]
    fn test_pop_load_register() {
        assert_eq!(assemble_line("pop cx"), Ok(0x6000 | 0x0800 | 2));
        assert_eq!(assemble_line("load ax"), Ok(0x8800));
    }

    #[test]
    fn test_illegal_opcode() {
        assert_eq!(assemble_line("halt"), Err(EncodeError::IllegalOpcode("halt".into())));
        assert_eq!(assemble_line("ADD 1 ax"), Err(EncodeError::IllegalOpcode("ADD".into())));
        assert_eq!(assemble_line("   "), Err(EncodeError::IllegalOpcode(String::new())));
        assert_eq!(assemble_line("42 ax"), Err(EncodeError::IllegalOpcode("42".into())));
    }

    #[test]
    fn test_invalid_operands() {
        assert_eq!(assemble_line("add"), Err(OperandError::Missing.into()));
        assert_eq!(assemble_line("add 1"), Err(OperandError::Missing.into()));
        assert_eq!(
            assemble_line("add 1 2"),
            Err(OperandError::ExpectedRegister("2".into()).into())
        );
        assert_eq!(
            assemble_line("mov ax 3"),
            Err(OperandError::ExpectedRegister("3".into()).into())
        );
        assert_eq!(
            assemble_line("push pc"),
            Err(OperandError::UnknownRegister("pc".into()).into())
        );
    }

    #[test]
    fn test_branch_register_operand_sets_flag_and_raw_index() {
        assert_eq!(assemble_line("jmp ax"), Ok(0xA800));
        assert_eq!(assemble_line("jnz cx"), Ok(0xB802));
        assert_eq!(assemble_line("jz ma"), Ok(0xC805));
        assert_eq!(assemble_line("jn bp"), Ok(0xD804));
        assert_eq!(assemble_line("call bx"), Ok(0xE801));
        assert_eq!(decode(0xA800), Instruction::Jmp { target: 2048 });
    }

    #[test]
    fn test_roundtrip_per_class() {
        let cases = [
            ("mult 17 bx", Instruction::Mult { src: Source::Immediate(17), dst: 1 }),
            ("mov sp bp", Instruction::Mov { src: Source::Register(3), dst: 4 }),
            ("push 1999", Instruction::Push { src: Source::Immediate(1999) }),
            ("store cx", Instruction::Store { src: Source::Register(2) }),
            ("pop ma", Instruction::Pop { dst: 5 }),
            ("call 300", Instruction::Call { target: 300 }),
            ("ret", Instruction::Ret),
        ];

        for (line, expected) in cases {
            let word = assemble_line(line).unwrap();
            assert_eq!(decode(word), expected, "{}", line);
        }
    }

    #[test]
    fn test_assemble_program() {
        let source = "\
# count down from 3
mov 3 cx

sub 1 cx
jnz 2
.
this line is never read
";
        let program = assemble(source).unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program[0], assemble_line("mov 3 cx").unwrap());
        assert_eq!(program[2], 0xB002);
    }

    #[test]
    fn test_short_lines_are_skipped() {
        let program = assemble("ab\nnop\n  \nx\r\nret\r\n").unwrap();
        assert_eq!(program, vec![0x0000, 0xF000]);
    }

    #[test]
    fn test_error_reports_line_number() {
        let err = assemble("nop\n# comment\nadd 300 ax\n").unwrap_err();
        assert_eq!(
            err,
            AssemblerError::InvalidOperand {
                line: 3,
                reason: OperandError::OutOfRange { value: 300, bits: 8 },
            }
        );
        assert_eq!(err.line(), 3);

        let err = assemble("nop\nfoo ax\n").unwrap_err();
        assert_eq!(err, AssemblerError::IllegalOpcode { line: 2, mnemonic: "foo".into() });
    }

    #[test]
    fn test_program_too_large() {
        let source = "nop\n".repeat(CODE_SIZE as usize);
        let err = assemble(&source).unwrap_err();
        assert_eq!(err, AssemblerError::ProgramTooLarge { line: 4096, available: 4095 });

        let source = "nop\n".repeat(CODE_SIZE as usize - 1);
        assert_eq!(assemble(&source).unwrap().len(), 4095);
    }
}
