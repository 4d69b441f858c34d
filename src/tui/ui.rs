//! Panel rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use crate::Register;
use super::app::DebuggerApp;

/// Register rows: two lines of three named registers each.
const REGISTER_ROWS: [[Register; 3]; 2] = [
    [Register::Ax, Register::Bx, Register::Cx],
    [Register::Sp, Register::Bp, Register::Ma],
];

pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let [body, footer] = Layout::vertical([Constraint::Min(8), Constraint::Length(4)])
        .areas(frame.area());
    let [code, machine] = Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
        .areas(body);
    let [registers, stack] = Layout::vertical([Constraint::Length(6), Constraint::Min(3)])
        .areas(machine);
    let [status, help] = Layout::horizontal([Constraint::Min(20), Constraint::Length(44)])
        .areas(footer);

    draw_code(frame, code, app);
    draw_registers(frame, registers, app);
    draw_stack(frame, stack, app);
    draw_footer(frame, status, help, app);
}

fn panel(title: String, color: Color) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::new().fg(color))
}

fn rows_inside(area: Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

/// Code segment listing centred on PC.
fn draw_code(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let items: Vec<ListItem> = app
        .get_disassembly(rows_inside(area))
        .into_iter()
        .map(|(addr, text, at_pc)| {
            let marker = match (at_pc, app.breakpoints.contains(&addr)) {
                (true, true) => "●▶",
                (true, false) => " ▶",
                (false, true) => "● ",
                (false, false) => "  ",
            };
            let style = if at_pc {
                Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(&addr) {
                Style::new().fg(Color::Red)
            } else if addr == 0 || addr >= app.limit {
                Style::new().fg(Color::DarkGray)
            } else {
                Style::new()
            };
            ListItem::new(format!("{} {:04}  {}", marker, addr, text)).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(panel(" Code ".into(), Color::Cyan)), area);
}

fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let mut lines: Vec<Line> = REGISTER_ROWS
        .iter()
        .map(|row| {
            let spans: Vec<Span> = row
                .iter()
                .flat_map(|&reg| {
                    [
                        Span::styled(format!("{:>3} ", reg.mnemonic()), Style::new().fg(Color::Green)),
                        Span::raw(format!("{:>7}  ", regs.read(reg))),
                    ]
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let state_color = if app.cpu.is_running() { Color::Green } else { Color::Red };
    lines.push(Line::from(vec![
        Span::styled(" pc ", Style::new().fg(Color::Yellow)),
        Span::raw(format!("{:>7}  ", regs.pc)),
        Span::styled(" ir ", Style::new().fg(Color::Yellow)),
        Span::raw(format!(" 0x{:04X}", regs.ir)),
    ]));
    lines.push(Line::from(vec![
        Span::raw(format!(" {} cycles  ", app.cpu.cycles)),
        Span::styled(format!("{:?}", app.cpu.state), Style::new().fg(state_color)),
    ]));

    frame.render_widget(Paragraph::new(lines).block(panel(" Registers ".into(), Color::Green)), area);
}

/// Stack words from the top down.
fn draw_stack(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let items: Vec<ListItem> = app
        .get_stack(rows_inside(area))
        .into_iter()
        .enumerate()
        .map(|(row, (addr, value))| {
            let item = ListItem::new(format!("{:05}  {:>7}", addr, value));
            if row == 0 && app.stack_scroll == 0 {
                item.style(Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            } else {
                item
            }
        })
        .collect();

    let title = format!(" Stack: {} words ", app.stack_depth());
    frame.render_widget(List::new(items).block(panel(title, Color::Magenta)), area);
}

fn draw_footer(frame: &mut Frame, status: Rect, help: Rect, app: &DebuggerApp) {
    frame.render_widget(
        Paragraph::new(app.status.as_str()).block(panel(" Status ".into(), Color::White)),
        status,
    );

    let keys = Paragraph::new(vec![
        Line::from("s step  r run  p pause  b breakpoint"),
        Line::from("x reset  ↑/↓ scroll stack  q quit"),
    ])
    .style(Style::new().fg(Color::DarkGray))
    .block(panel(" Keys ".into(), Color::DarkGray));
    frame.render_widget(keys, help);
}
