//! AMF+1 CPU registers.
//!
//! Eight 16-bit register slots, six of them named and visible to software:
//! - AX, BX: accumulators
//! - CX: counter, tested by conditional branches
//! - SP, BP: stack pointer and stack base
//! - MA: memory address
//!
//! Plus two internal registers no instruction can name:
//! - PC: address of the instruction being executed
//! - IR: the instruction word last fetched

use crate::cpu::memory::{PROGRAM_ORIGIN, STACK_SEGMENT};
use crate::isa::{Register, REGISTER_SLOTS};
use serde::{Serialize, Deserialize};

/// The AMF+1 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Register slots, indexed by a 3-bit register field.
    slots: [i16; REGISTER_SLOTS],

    /// PC: program counter (internal)
    pub pc: u16,

    /// IR: instruction register (internal)
    pub ir: u16,
}

impl Registers {
    /// Create a register file in its power-on state: everything zero
    /// except `sp`, which starts at the base of the stack segment.
    pub fn new() -> Self {
        let mut slots = [0; REGISTER_SLOTS];
        slots[Register::Sp.index() as usize] = STACK_SEGMENT as i16;
        Self {
            slots,
            pc: PROGRAM_ORIGIN,
            ir: 0,
        }
    }

    /// Reset all registers to the power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a slot by its 3-bit field value.
    #[inline]
    pub fn get(&self, index: u8) -> i16 {
        self.slots[index as usize % REGISTER_SLOTS]
    }

    /// Write a slot by its 3-bit field value.
    #[inline]
    pub fn set(&mut self, index: u8, value: i16) {
        self.slots[index as usize % REGISTER_SLOTS] = value;
    }

    #[inline]
    pub fn read(&self, reg: Register) -> i16 {
        self.get(reg.index())
    }

    #[inline]
    pub fn write(&mut self, reg: Register, value: i16) {
        self.set(reg.index(), value);
    }

    #[inline]
    pub fn cx(&self) -> i16 {
        self.read(Register::Cx)
    }

    #[inline]
    pub fn sp(&self) -> i16 {
        self.read(Register::Sp)
    }

    #[inline]
    pub fn ma(&self) -> i16 {
        self.read(Register::Ma)
    }

    /// All slots, including the two unnamed ones.
    pub fn slots(&self) -> &[i16; REGISTER_SLOTS] {
        &self.slots
    }

    /// Increment the program counter by 1.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set up a transfer to `target`.
    ///
    /// PC is left one short of the target because every instruction is
    /// followed by an automatic increment.
    pub fn jump(&mut self, target: u16) {
        self.pc = target.wrapping_sub(1);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
