//! CPU execution engine for AMF+1.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! Handlers validate before they mutate, so a failed instruction leaves
//! registers and memory as they were.

use crate::cpu::{Memory, Registers};
use crate::cpu::decode::{self, Instruction, Source};
use crate::cpu::memory::{MemoryError, Segment, CODE_SIZE, PROGRAM_ORIGIN, STACK_LIMIT, STACK_SEGMENT};
use crate::isa::Register;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// The last run reached its address limit.
    Finished,
    /// CPU encountered an error.
    Error,
}

/// Anomalies that are reported alongside, not instead of, an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityWarning {
    /// `ma` pointed into the code segment during `load` or `store`.
    CodeSegmentAccess { pc: u16, addr: i16 },
}

impl std::fmt::Display for SecurityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityWarning::CodeSegmentAccess { pc, addr } => {
                write!(f, "nasty hacker alert: ma={} addresses the code segment at PC={}", addr, pc)
            }
        }
    }
}

/// The AMF+1 CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count (for profiling).
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
    /// Security warnings raised so far.
    warnings: Vec<SecurityWarning>,
}

impl Cpu {
    /// Create a new CPU with zeroed state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
            warnings: Vec::new(),
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
        self.warnings.clear();
    }

    /// Load a program at [`PROGRAM_ORIGIN`].
    ///
    /// Returns the exclusive end address, which is the natural run limit.
    pub fn load_program(&mut self, program: &[u16]) -> Result<u16, MemoryError> {
        self.mem.load_program(PROGRAM_ORIGIN, program)?;
        Ok(PROGRAM_ORIGIN + program.len() as u16)
    }

    /// Execute a single instruction at PC.
    ///
    /// Returns the instruction that was executed, or an error carrying the
    /// PC of the failing instruction.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        let pc = self.regs.pc;

        if self.state == CpuState::Error {
            return Err(CpuError::new(pc, CpuErrorKind::NotRunning));
        }

        // Fetch
        if pc >= CODE_SIZE {
            return Err(self.fault(pc, CpuErrorKind::InvalidControlTransfer { target: pc as i32 }));
        }
        self.regs.ir = self.mem.fetch(pc);

        // Decode
        let instr = decode::decode(self.regs.ir);

        // Execute
        if let Err(kind) = self.execute(instr) {
            return Err(self.fault(pc, kind));
        }

        // Advance
        self.regs.advance_pc();
        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run from `start` until PC reaches `limit`.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self, start: u16, limit: u16) -> Result<u64, CpuError> {
        self.run_limited(start, limit, u64::MAX)
    }

    /// Run from `start` until PC reaches `limit`, executing at most
    /// `max_cycles` instructions.
    pub fn run_limited(&mut self, start: u16, limit: u16, max_cycles: u64) -> Result<u64, CpuError> {
        self.run_traced(start, limit, max_cycles, |_, _| {})
    }

    /// Like [`Cpu::run_limited`], calling `on_step` with the CPU and the
    /// address of each instruction after it executes. `regs.ir` still
    /// holds the executed word at that point.
    ///
    /// A CPU that has faulted stays faulted until [`Cpu::reset`].
    pub fn run_traced<F>(&mut self, start: u16, limit: u16, max_cycles: u64, mut on_step: F) -> Result<u64, CpuError>
    where
        F: FnMut(&Cpu, u16),
    {
        if self.state == CpuState::Error {
            return Err(CpuError::new(self.regs.pc, CpuErrorKind::NotRunning));
        }
        self.regs.pc = start;
        self.state = CpuState::Running;

        let mut executed = 0;
        while self.regs.pc < limit && executed < max_cycles {
            let pc = self.regs.pc;
            self.step()?;
            executed += 1;
            on_step(self, pc);
        }

        if self.regs.pc >= limit {
            self.state = CpuState::Finished;
        }
        Ok(executed)
    }

    fn fault(&mut self, pc: u16, kind: CpuErrorKind) -> CpuError {
        self.state = CpuState::Error;
        CpuError::new(pc, kind)
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Result<(), CpuErrorKind> {
        match instr {
            Instruction::Nop => {}

            // ==================== ALU ====================

            Instruction::Add { src, dst } => {
                self.alu(src, dst, i16::wrapping_add);
            }

            Instruction::Sub { src, dst } => {
                self.alu(src, dst, i16::wrapping_sub);
            }

            Instruction::Mult { src, dst } => {
                self.alu(src, dst, i16::wrapping_mul);
            }

            Instruction::Div { src, dst } => {
                let divisor = self.source_value(src);
                if divisor == 0 {
                    return Err(CpuErrorKind::DivisionByZero);
                }
                let dividend = self.regs.get(dst);
                self.regs.set(dst, dividend.wrapping_div(divisor));
                // Written last so that `div n cx` keeps the remainder.
                self.regs.write(Register::Cx, dividend.wrapping_rem(divisor));
            }

            Instruction::Mov { src, dst } => {
                let value = self.source_value(src);
                self.regs.set(dst, value);
            }

            // ==================== Memory ====================

            Instruction::Push { src } => {
                let value = self.source_value(src);
                let sp = self.check_push()?;
                self.push_unchecked(sp, value);
            }

            Instruction::Pop { dst } => {
                let (sp, value) = self.stack_top()?;
                self.regs.write(Register::Sp, sp as i16);
                self.regs.set(dst, value);
            }

            Instruction::Load { dst } => {
                let addr = self.data_address()?;
                let value = self.mem.read(addr);
                self.regs.set(dst, value);
            }

            Instruction::Store { src } => {
                let value = self.source_value(src);
                let addr = self.data_address()?;
                self.mem.write(addr, value);
            }

            // ==================== Control Flow ====================

            Instruction::Jmp { target } => {
                self.jump(target)?;
            }

            Instruction::Jnz { target } => {
                if self.regs.cx() != 0 {
                    self.jump(target)?;
                }
            }

            Instruction::Jz { target } => {
                if self.regs.cx() == 0 {
                    self.jump(target)?;
                }
            }

            Instruction::Jn { target } => {
                if self.regs.cx() < 0 {
                    self.jump(target)?;
                }
            }

            Instruction::Call { target } => {
                let sp = self.check_push()?;
                check_target(target)?;
                let return_addr = self.regs.pc as i16;
                self.push_unchecked(sp, return_addr);
                self.regs.jump(target);
            }

            Instruction::Ret => {
                let (sp, addr) = self.stack_top()?;
                if addr < 0 || addr as u16 >= CODE_SIZE {
                    return Err(CpuErrorKind::InvalidControlTransfer { target: addr as i32 });
                }
                self.regs.write(Register::Sp, sp as i16);
                self.regs.pc = addr as u16;
            }
        }

        Ok(())
    }

    fn source_value(&self, src: Source) -> i16 {
        match src {
            Source::Register(r) => self.regs.get(r),
            Source::Immediate(v) => v as i16,
        }
    }

    fn alu(&mut self, src: Source, dst: u8, op: fn(i16, i16) -> i16) {
        let value = self.source_value(src);
        let result = op(self.regs.get(dst), value);
        self.regs.set(dst, result);
    }

    /// `sp` as a stack address, provided it lies inside the stack segment.
    fn stack_pointer(&self) -> Result<u16, CpuErrorKind> {
        let sp = self.regs.sp();
        if sp < STACK_SEGMENT as i16 || sp >= STACK_LIMIT as i16 {
            return Err(CpuErrorKind::StackPointerCorruption { sp });
        }
        Ok(sp as u16)
    }

    /// Check that one more word fits; returns the slot to write.
    fn check_push(&self) -> Result<u16, CpuErrorKind> {
        let sp = self.stack_pointer()?;
        if sp + 1 >= STACK_LIMIT {
            return Err(CpuErrorKind::StackOverflow);
        }
        Ok(sp)
    }

    fn push_unchecked(&mut self, sp: u16, value: i16) {
        self.mem.write(sp as usize, value);
        self.regs.write(Register::Sp, (sp + 1) as i16);
    }

    /// The new `sp` and the value a pop would produce, without popping.
    fn stack_top(&self) -> Result<(u16, i16), CpuErrorKind> {
        let sp = self.stack_pointer()?;
        if sp <= STACK_SEGMENT {
            return Err(CpuErrorKind::StackUnderflow);
        }
        let top = sp - 1;
        Ok((top, self.mem.read(top as usize)))
    }

    /// Address in `ma`, provided it is outside the code segment.
    fn data_address(&mut self) -> Result<usize, CpuErrorKind> {
        let addr = self.regs.ma();
        if addr < 0 {
            return Err(CpuErrorKind::InvalidMemoryAddress { addr });
        }
        if Segment::of(addr as u16) == Segment::Code {
            self.warnings.push(SecurityWarning::CodeSegmentAccess { pc: self.regs.pc, addr });
            return Err(CpuErrorKind::InvalidMemoryAddress { addr });
        }
        Ok(addr as usize)
    }

    fn jump(&mut self, target: u16) -> Result<(), CpuErrorKind> {
        check_target(target)?;
        self.regs.jump(target);
        Ok(())
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Security warnings raised since the last reset.
    pub fn warnings(&self) -> &[SecurityWarning] {
        &self.warnings
    }

    /// Value on top of the stack, if the stack is non-empty.
    pub fn top_of_stack(&self) -> Option<i16> {
        self.stack_top().ok().map(|(_, value)| value)
    }

    /// Check if the last run reached its limit.
    pub fn is_finished(&self) -> bool {
        self.state == CpuState::Finished
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

/// Branch targets must name a code address other than 0.
fn check_target(target: u16) -> Result<(), CpuErrorKind> {
    if target == 0 || target >= CODE_SIZE {
        return Err(CpuErrorKind::InvalidOperand { target });
    }
    Ok(())
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// A runtime failure and the PC of the instruction that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at PC={pc}")]
pub struct CpuError {
    pub pc: u16,
    pub kind: CpuErrorKind,
}

impl CpuError {
    pub fn new(pc: u16, kind: CpuErrorKind) -> Self {
        Self { pc, kind }
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuErrorKind {
    #[error("CPU not running")]
    NotRunning,

    #[error("Stack Overflow")]
    StackOverflow,

    #[error("Stack Underflow")]
    StackUnderflow,

    #[error("Stack Pointer Corruption (sp={sp})")]
    StackPointerCorruption { sp: i16 },

    #[error("Invalid Operand (target={target})")]
    InvalidOperand { target: u16 },

    #[error("Invalid Memory Address (ma={addr})")]
    InvalidMemoryAddress { addr: i16 },

    #[error("Invalid Control Transfer (target={target})")]
    InvalidControlTransfer { target: i32 },

    #[error("Division By Zero")]
    DivisionByZero,
}
