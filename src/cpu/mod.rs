//! CPU emulation for AMF+1.
//!
//! This module implements the complete AMF+1 architecture:
//! - 32K sixteen-bit memory words split into code, stack, and heap segments
//! - 6 named registers plus the internal PC and IR
//! - 16-instruction set with fixed 16-bit instruction words

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::{Memory, MemoryError, Segment};
pub use registers::Registers;
pub use decode::{Instruction, Source};
pub use execute::{Cpu, CpuError, CpuErrorKind, CpuState, SecurityWarning};
