//! Debugger state: the machine, its program, breakpoints, and run mode.

use crate::Cpu;
use crate::asm::disasm::{disassemble_instruction, format_instruction};
use crate::cpu::memory::{MemoryError, CODE_SIZE, STACK_SEGMENT};
use std::collections::HashSet;

/// Everything the debugger panels render from.
pub struct DebuggerApp {
    pub cpu: Cpu,
    /// Assembled words, kept so `reset` can reload them.
    pub program: Vec<u16>,
    /// Exclusive end address of the loaded program.
    pub limit: u16,
    /// Code addresses that stop a run before they execute.
    pub breakpoints: HashSet<u16>,
    /// Set while `tick` keeps stepping.
    pub running: bool,
    pub should_quit: bool,
    /// Last event, shown in the status panel.
    pub status: String,
    /// Stack view scroll offset, in words below the top of stack.
    pub stack_scroll: usize,
}

impl DebuggerApp {
    /// Load `program` at the origin of a fresh machine.
    pub fn new(program: Vec<u16>) -> Result<Self, MemoryError> {
        let mut cpu = Cpu::new();
        let limit = cpu.load_program(&program)?;

        Ok(Self {
            cpu,
            program,
            limit,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            stack_scroll: 0,
        })
    }

    /// Has execution reached the end of the program?
    pub fn at_limit(&self) -> bool {
        self.cpu.regs.pc >= self.limit
    }

    /// Execute one instruction, or report that the program is done.
    pub fn step(&mut self) {
        if self.at_limit() {
            self.status = format!("Program finished after {} cycles", self.cpu.cycles);
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.pc;
        let warnings_before = self.cpu.warnings().len();
        match self.cpu.step() {
            Ok(instr) => {
                self.status = format!("PC={:04}: {}", pc, format_instruction(&instr));
            }
            Err(e) => {
                self.status = match self.cpu.warnings().get(warnings_before) {
                    Some(warning) => format!("Error: {} ({})", e, warning),
                    None => format!("Error: {}", e),
                };
                self.running = false;
            }
        }
    }

    /// Run until the program limit, a breakpoint, or an error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// One step of a continuous run; called once per event-loop turn.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() || self.at_limit() {
            self.running = false;
            self.status = format!("Stopped after {} cycles", self.cpu.cycles);
            return;
        }

        // Check for breakpoint
        let pc = self.cpu.regs.pc;
        if self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={}", pc);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.contains(&pc) {
            self.breakpoints.remove(&pc);
            self.status = format!("Removed breakpoint at PC={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={}", pc);
        }
    }

    /// Power-cycle the machine and reload the program. Breakpoints survive.
    pub fn reset(&mut self) -> Result<(), MemoryError> {
        let mut cpu = Cpu::new();
        self.limit = cpu.load_program(&self.program)?;
        self.cpu = cpu;
        self.running = false;
        self.stack_scroll = 0;
        self.status = "Reset. Ready.".into();
        Ok(())
    }

    /// `(address, text, is_pc)` rows for a window of code centred on PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u16, String, bool)> {
        let pc = self.cpu.regs.pc as i32;
        let start = (pc - (lines as i32 / 2)).max(0);

        (0..lines as i32)
            .map(|i| start + i)
            .filter(|&addr| addr < CODE_SIZE as i32)
            .map(|addr| {
                let word = self.cpu.mem.fetch(addr as u16);
                (addr as u16, disassemble_instruction(word), addr == pc)
            })
            .collect()
    }

    /// Stack entries from the top down, skipping `stack_scroll` words.
    pub fn get_stack(&self, lines: usize) -> Vec<(u16, i16)> {
        let sp = self.cpu.regs.sp();
        if sp <= STACK_SEGMENT as i16 {
            return Vec::new();
        }

        (STACK_SEGMENT..sp as u16)
            .rev()
            .skip(self.stack_scroll)
            .take(lines)
            .map(|addr| (addr, self.cpu.mem.read(addr as usize)))
            .collect()
    }

    /// Number of words on the stack.
    pub fn stack_depth(&self) -> usize {
        (self.cpu.regs.sp() as i32 - STACK_SEGMENT as i32).max(0) as usize
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: char) {
        match key {
            'q' => self.should_quit = true,
            's' => {
                self.running = false;
                self.step();
            }
            'r' => self.run(),
            'p' => {
                self.running = false;
                self.status = "Paused.".into();
            }
            'b' => self.toggle_breakpoint(),
            'x' => {
                if let Err(e) = self.reset() {
                    self.status = format!("Error: {}", e);
                }
            }
            _ => {}
        }
    }

    /// Scroll the stack view by `delta` words, clamped to the stack depth.
    pub fn scroll_stack(&mut self, delta: isize) {
        let max = self.stack_depth().saturating_sub(1);
        self.stack_scroll = self.stack_scroll.saturating_add_signed(delta).min(max);
    }
}

/// Run the debugger in the terminal until the user quits.
pub fn run_debugger(program: Vec<u16>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::{backend::CrosstermBackend, Terminal};
    use std::io::{self, stdout};
    use std::time::Duration;

    let mut app = DebuggerApp::new(program)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    while !app.should_quit {
        terminal.draw(|frame| super::ui::draw(frame, &app))?;

        let timeout = if app.running { Duration::from_millis(1) } else { Duration::from_millis(50) };
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char(c) => app.handle_key(c),
                        KeyCode::Up => app.scroll_stack(-1),
                        KeyCode::Down => app.scroll_stack(1),
                        _ => {}
                    }
                }
            }
        }

        app.tick();
    }

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
