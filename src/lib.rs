//! # VMF+1
//!
//! An emulator and assembler for AMF+1, a small 16-bit abstract machine.
//!
//! AMF+1 has 16 instructions packed into fixed 16-bit words, six
//! software-visible registers, and 32K words of memory split into code,
//! stack, and heap segments. The assembler and the CPU share one binary
//! contract, the instruction layout in [`isa::layout`].

pub mod isa;
pub mod cpu;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use isa::{Opcode, Register};
pub use cpu::{Cpu, CpuState, CpuError, CpuErrorKind, Memory, Registers, Instruction};
pub use asm::{assemble, assemble_line, disassemble, AssemblerError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
