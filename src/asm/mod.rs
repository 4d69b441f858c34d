//! Assembler and disassembler for AMF+1 programs.
//!
//! This module provides:
//! - A line lexer and a single-pass assembler (text → instruction words)
//! - A disassembler and trace renderer (words → readable text)

pub mod lexer;
pub mod assembler;
pub mod disasm;

pub use assembler::{assemble, assemble_line, AssemblerError, EncodeError, OperandError};
pub use disasm::{disassemble, disassemble_instruction, render_status};
