//! TUI debugger for the AMF+1 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register file view, including the internal PC and IR
//! - Stack view
//! - Step/run/breakpoint controls
//! - Disassembly view

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
