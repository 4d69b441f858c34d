//! VMF+1 - CLI Entry Point
//!
//! Commands:
//! - `vmf run [program]` - Assemble and run a source file or stdin
//! - `vmf debug <program>` - Interactive debugger
//! - `vmf disasm [program]` - Show what a source file assembles to

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;

#[derive(Parser)]
#[command(name = "vmf")]
#[command(version = "0.1.0")]
#[command(about = "An emulator and assembler for the AMF+1 16-bit abstract machine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until PC leaves the loaded range
    Run {
        /// Assembly source to execute (stdin when omitted or `-`)
        program: Option<String>,
        /// Maximum number of cycles to run (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    Debug {
        /// Assembly source to debug
        program: String,
    },
    /// Assemble a program and print its listing
    Disasm {
        /// Assembly source (stdin when omitted or `-`)
        program: Option<String>,
    },
    /// Run the built-in self-test
    Test,
}

/// Final machine summary for `run --json`.
#[derive(Serialize)]
struct RunReport {
    cycles: u64,
    state: vmf::CpuState,
    registers: vmf::Registers,
    top_of_stack: Option<i16>,
    warnings: Vec<String>,
    error: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, json }) => {
            run_program(program.as_deref(), max_cycles, trace, json);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_program(program.as_deref());
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("VMF+1 v0.1.0");
            println!("An AMF+1 16-bit abstract machine");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn fail(message: String) -> ! {
    eprintln!("❌ {}", message);
    std::process::exit(1);
}

/// Read and assemble a source file, or stdin for `None` and `-`.
fn load_words(path: Option<&str>) -> Vec<u16> {
    let source = match path {
        None | Some("-") => {
            let mut source = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut source) {
                fail(format!("Failed to read stdin: {}", e));
            }
            source
        }
        Some(path) => std::fs::read_to_string(path)
            .unwrap_or_else(|e| fail(format!("Failed to read file: {}", e))),
    };
    vmf::assemble(&source).unwrap_or_else(|e| fail(format!("Assembly error: {}", e)))
}

fn run_program(path: Option<&str>, max_cycles: u64, trace: bool, json: bool) {
    use vmf::Cpu;
    use vmf::asm::{disassemble_instruction, render_status};
    use vmf::cpu::memory::PROGRAM_ORIGIN;

    let words = load_words(path);

    let mut cpu = Cpu::new();
    let limit = cpu.load_program(&words)
        .unwrap_or_else(|e| fail(format!("Failed to load program: {}", e)));

    if !json {
        println!("📝 Loaded {} instructions", words.len());
        println!();
        println!("━━━ Execution ━━━");
    }

    let mut reported = 0;
    let result = cpu.run_traced(PROGRAM_ORIGIN, limit, max_cycles, |cpu, pc| {
        if trace {
            println!("{:04}: {}", pc, disassemble_instruction(cpu.regs.ir));
            println!("      {}", render_status(cpu));
        }
        for warning in &cpu.warnings()[reported..] {
            eprintln!("⚠️  {}", warning);
        }
        reported = cpu.warnings().len();
    });
    // A failing instruction can raise a warning without reaching the callback.
    for warning in &cpu.warnings()[reported..] {
        eprintln!("⚠️  {}", warning);
    }

    let (executed, error) = match result {
        Ok(executed) => (executed, None),
        Err(e) => (cpu.cycles, Some(e)),
    };

    if json {
        let report = RunReport {
            cycles: cpu.cycles,
            state: cpu.state,
            registers: cpu.regs.clone(),
            top_of_stack: cpu.top_of_stack(),
            warnings: cpu.warnings().iter().map(|w| w.to_string()).collect(),
            error: error.as_ref().map(|e| e.to_string()),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(format!("Failed to render report: {}", e)),
        }
    } else {
        println!();
        println!("━━━ Result ━━━");
        println!("Cycles: {}", executed);
        println!("{}", render_status(&cpu));

        if cpu.is_running() {
            println!();
            println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
        }
    }

    if let Some(e) = error {
        fail(format!("Runtime error: {}", e));
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) {
    use vmf::tui::run_debugger;

    println!("🔍 Loading: {}", path);
    let words = load_words(Some(path));

    if words.is_empty() {
        fail("No instructions to execute".into());
    }

    println!("🚀 Launching debugger...");
    println!();

    if let Err(e) = run_debugger(words) {
        fail(format!("Debugger error: {}", e));
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str) {
    fail("this build was compiled without the `tui` feature".into());
}

fn disassemble_program(path: Option<&str>) {
    use vmf::cpu::memory::PROGRAM_ORIGIN;

    let words = load_words(path);
    println!("{}", vmf::disassemble(&words, PROGRAM_ORIGIN));
}

/// Assemble and run `source`, returning the CPU or a printable error.
fn run_source(source: &str) -> Result<vmf::Cpu, String> {
    use vmf::cpu::memory::PROGRAM_ORIGIN;

    let words = vmf::assemble(source).map_err(|e| e.to_string())?;
    let mut cpu = vmf::Cpu::new();
    let limit = cpu.load_program(&words).map_err(|e| e.to_string())?;
    cpu.run_limited(PROGRAM_ORIGIN, limit, 10_000).map_err(|e| e.to_string())?;
    Ok(cpu)
}

fn run_self_test() {
    use vmf::{assemble_line, CpuErrorKind, Register};
    use vmf::asm::disassemble_instruction;

    println!("━━━ VMF+1 Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;
    let mut check = |name: &str, ok: bool, detail: String| {
        print!("{}... ", name);
        if ok {
            println!("✓");
            passed += 1;
        } else {
            println!("✗ ({})", detail);
            failed += 1;
        }
    };

    // Test 1: Known encodings
    let encodings = [("nop", 0x0000u16), ("add 3 ax", 0x1018), ("push 2047", 0x57FF), ("ret", 0xF000)];
    let bad: Vec<_> = encodings
        .iter()
        .filter(|(line, word)| assemble_line(line).ok() != Some(*word))
        .map(|(line, _)| *line)
        .collect();
    check("Instruction encoding", bad.is_empty(), format!("mismatch on {:?}", bad));

    // Test 2: Disassembly round trip
    let bad: Vec<_> = ["mov 7 bx", "sub ax cx", "push bp", "pop ma", "jnz 12"]
        .iter()
        .filter(|line| assemble_line(line).map(disassemble_instruction).ok().as_deref() != Some(**line))
        .collect();
    check("Disassembly round trip", bad.is_empty(), format!("mismatch on {:?}", bad));

    // Test 3: Arithmetic
    match run_source("mov 7 ax\nmov 3 bx\nmult bx ax\nsub 1 ax\n") {
        Ok(cpu) => {
            let ax = cpu.regs.read(Register::Ax);
            check("CPU arithmetic", ax == 20, format!("got {}, expected 20", ax));
        }
        Err(e) => check("CPU arithmetic", false, e),
    }

    // Test 4: Stack discipline
    match run_source("push 5\npush 9\npop ax\npop bx\n") {
        Ok(cpu) => {
            let pair = (cpu.regs.read(Register::Ax), cpu.regs.read(Register::Bx));
            check("Stack push/pop", pair == (9, 5), format!("got {:?}, expected (9, 5)", pair));
        }
        Err(e) => check("Stack push/pop", false, e),
    }

    // Test 5: Countdown loop
    match run_source("mov 5 cx\nadd cx ax\nsub 1 cx\njnz 2\n") {
        Ok(cpu) => {
            let ax = cpu.regs.read(Register::Ax);
            check("Conditional branch loop", ax == 15 && cpu.regs.cx() == 0, format!("ax={} cx={}", ax, cpu.regs.cx()));
        }
        Err(e) => check("Conditional branch loop", false, e),
    }

    // Test 6: Runtime fault detection
    let mut cpu = vmf::Cpu::new();
    let underflow = vmf::assemble("pop ax\n")
        .ok()
        .and_then(|words| cpu.load_program(&words).ok())
        .map(|limit| cpu.run(1, limit));
    let ok = matches!(underflow, Some(Err(ref e)) if e.kind == CpuErrorKind::StackUnderflow);
    check("Stack underflow detection", ok, format!("got {:?}", underflow));

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
