//! WebAssembly bindings for the AMF+1 emulator.
//!
//! `WasmCpu` owns a machine and the last program loaded into it, so a
//! page can step, run, and reset without re-assembling.

use wasm_bindgen::prelude::*;
use crate::{Cpu, Register};
use crate::asm::assembler::assemble;
use crate::asm::disasm::{disassemble_instruction, format_instruction};
use crate::cpu::memory::{MEMORY_SIZE, PROGRAM_ORIGIN};
use serde::Serialize;

/// Route Rust panics to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// A machine plus the words and run limit of its loaded program.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: Vec<u16>,
    limit: u16,
}

#[derive(Serialize)]
struct RegisterDump {
    ax: i16,
    bx: i16,
    cx: i16,
    sp: i16,
    bp: i16,
    ma: i16,
    pc: u16,
    ir: u16,
    cycles: u64,
}

#[wasm_bindgen]
impl WasmCpu {
    /// An empty machine with nothing loaded.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            program: Vec::new(),
            limit: PROGRAM_ORIGIN,
        }
    }

    /// Assemble `source` into a fresh machine. Returns the word count.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let words = assemble(source)
            .map_err(|e| JsError::new(&e.to_string()))?;

        self.cpu = Cpu::new();
        self.limit = self.cpu.load_program(&words)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.program = words;

        Ok(self.program.len())
    }

    /// Execute the instruction at PC and return it as assembly text.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        if self.cpu.regs.pc >= self.limit {
            return Err(JsError::new("program finished"));
        }

        let instr = self.cpu.step()
            .map_err(|e| JsError::new(&e.to_string()))?;

        Ok(format_instruction(&instr))
    }

    /// Run from the current PC to the program limit or `max_cycles`.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        let start = self.cpu.regs.pc;
        self.cpu.run_limited(start, self.limit, max_cycles as u64)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.cpu.cycles)
    }

    /// Power-cycle the machine and reload the current program.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        let mut cpu = Cpu::new();
        self.limit = cpu.load_program(&self.program)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.cpu = cpu;
        Ok(())
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Instructions executed since the last load or reset.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.pc
    }

    /// Get register slot `index` (0-7).
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> i16 {
        self.cpu.regs.get(index)
    }

    /// `Running`, `Finished`, or `Error`.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Get memory cell value, 0 outside the address space.
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: usize) -> i16 {
        if addr < MEMORY_SIZE {
            self.cpu.mem.read(addr)
        } else {
            0
        }
    }

    /// Values of up to `count` cells starting at `start`.
    #[wasm_bindgen]
    pub fn memory_range(&self, start: usize, count: usize) -> js_sys::Int16Array {
        let values: Vec<i16> = self.cpu.mem.dump(start, count).into_iter().map(|(_, value)| value).collect();
        js_sys::Int16Array::from(values.as_slice())
    }

    /// Register file, PC, IR, and cycle count as a JSON object.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> String {
        let regs = &self.cpu.regs;
        let dump = RegisterDump {
            ax: regs.read(Register::Ax),
            bx: regs.read(Register::Bx),
            cx: regs.read(Register::Cx),
            sp: regs.read(Register::Sp),
            bp: regs.read(Register::Bp),
            ma: regs.read(Register::Ma),
            pc: regs.pc,
            ir: regs.ir,
            cycles: self.cpu.cycles,
        };
        serde_json::to_string(&dump).unwrap_or_default()
    }

    /// Security warnings raised so far, one message per entry.
    #[wasm_bindgen]
    pub fn warnings(&self) -> Vec<String> {
        self.cpu.warnings().iter().map(|w| w.to_string()).collect()
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of words `source` assembles to, or the first assembly error.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    let words = assemble(source)
        .map_err(|e| JsError::new(&e.to_string()))?;
    Ok(words.len())
}

/// Disassemble a single instruction word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u16) -> String {
    disassemble_instruction(word)
}
