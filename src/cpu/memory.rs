//! AMF+1 memory subsystem.
//!
//! 64K bytes of RAM, addressed as 32K signed 16-bit words and split into
//! fixed segments:
//! - Code: 0-4095
//! - Stack: 4096-12287, growing upward
//! - Heap: the rest, growing downward from the top

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of addressable 16-bit words.
pub const MEMORY_SIZE: usize = 65536 / 2;

/// Number of words in the code segment; also the first stack address.
pub const CODE_SIZE: u16 = 4096;
/// Lowest legal value of `sp`.
pub const STACK_SEGMENT: u16 = 4096;
/// First address past the stack segment (12K).
pub const STACK_LIMIT: u16 = 12 * 1024;

/// Where the loader places the first instruction.
pub const PROGRAM_ORIGIN: u16 = 1;

/// Segment an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Code,
    Stack,
    Heap,
}

impl Segment {
    pub fn of(addr: u16) -> Self {
        if addr < CODE_SIZE {
            Segment::Code
        } else if addr < STACK_LIMIT {
            Segment::Stack
        } else {
            Segment::Heap
        }
    }
}

/// Main memory: 32768 signed words.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<i16>,
}

impl Memory {
    /// Power-on memory: every word zero.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a cell.
    ///
    /// # Panics
    /// Panics if address is out of range.
    #[inline]
    pub fn read(&self, addr: usize) -> i16 {
        assert!(addr < MEMORY_SIZE, "Memory address {} out of range (0-{})", addr, MEMORY_SIZE - 1);
        self.cells[addr]
    }

    /// Write a cell.
    ///
    /// # Panics
    /// Panics if address is out of range.
    #[inline]
    pub fn write(&mut self, addr: usize, value: i16) {
        assert!(addr < MEMORY_SIZE, "Memory address {} out of range (0-{})", addr, MEMORY_SIZE - 1);
        self.cells[addr] = value;
    }

    /// Read a cell as an instruction word.
    #[inline]
    pub fn fetch(&self, addr: u16) -> u16 {
        self.read(addr as usize) as u16
    }

    /// Zero every word, code included.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Load a program into the code segment starting at the given address.
    pub fn load_program(&mut self, start_addr: u16, program: &[u16]) -> Result<(), MemoryError> {
        let start = start_addr as usize;
        let available = (CODE_SIZE as usize).saturating_sub(start);
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        for (i, &word) in program.iter().enumerate() {
            self.cells[start + i] = word as i16;
        }

        Ok(())
    }

    /// `(address, value)` pairs for up to `count` cells from `start`.
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, i16)> {
        let end = (start + count).min(MEMORY_SIZE);
        (start..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Loader failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Program does not fit in the code segment.
    #[error("program size {size} exceeds available code space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
