//! The AMF+1 instruction set.
//!
//! This module holds everything the assembler and the CPU must agree on:
//! - [`Opcode`] - the 16 operations and their mnemonics
//! - [`Register`] - the 6 software-visible registers
//! - [`layout`] - the bit layout of a 16-bit instruction word

mod opcode;
mod register;
pub mod layout;

pub use opcode::{Opcode, OperandClass};
pub use register::{Register, REGISTER_SLOTS};
