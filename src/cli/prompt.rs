//! Interactive input: the task prompt, the mode menu and the company form.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::Result;
use crossterm::{
    cursor::{MoveDown, MoveToColumn, MoveToPreviousLine, MoveUp},
    event::{self, Event, KeyEventKind},
    queue,
    style::{Print, Stylize},
    terminal::{self, Clear, ClearType},
};

use super::state::{KeyOutcome, LineEditor, MenuState};
use super::ui;
use crate::agents::AgentMode;

const PROMPT: &str = "  → ";

/// Result of asking the user for input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompted<T> {
    Value(T),
    Cancelled,
}

/// Raw mode for as long as the guard lives.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn interactive() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

/// Read a task from the terminal with `placeholder` shown while empty.
pub fn read_line(placeholder: &str) -> Result<Prompted<String>> {
    if !interactive() {
        return read_piped_line();
    }

    let mut out = io::stdout();
    let width = ui::terminal_width();
    let _raw = RawModeGuard::enable()?;

    // Toolbar goes on the line below, then the cursor returns to the prompt
    queue!(out, Print("\r\n"), Print("─".repeat(width).dark_grey()), MoveUp(1))?;

    let mut editor = LineEditor::new();
    let outcome = loop {
        draw_line(&mut out, &editor, placeholder)?;
        let Event::Key(key) = event::read()? else { continue };
        if key.kind == KeyEventKind::Release {
            continue;
        }
        match editor.handle_key(key) {
            KeyOutcome::Continue => {}
            KeyOutcome::Submit => break Prompted::Value(editor.text()),
            KeyOutcome::Cancel => break Prompted::Cancelled,
        }
    };

    queue!(out, MoveDown(1), Print("\r\n"))?;
    out.flush()?;
    Ok(outcome)
}

fn read_piped_line() -> Result<Prompted<String>> {
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(Prompted::Cancelled);
    }
    Ok(Prompted::Value(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn draw_line(out: &mut impl Write, editor: &LineEditor, placeholder: &str) -> Result<()> {
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(PROMPT.cyan().bold())
    )?;
    if editor.is_empty() {
        queue!(out, Print(placeholder.dim().italic()))?;
    } else {
        queue!(out, Print(editor.text()))?;
    }
    let column = PROMPT.chars().count() + editor.cursor();
    queue!(out, MoveToColumn(column as u16))?;
    out.flush()?;
    Ok(())
}

/// Ask which assistant to run. Outside a terminal this is `General`.
pub fn select_mode() -> Result<Prompted<AgentMode>> {
    if !interactive() {
        return Ok(Prompted::Value(AgentMode::General));
    }

    let mut out = io::stdout();
    writeln!(out, "{}", "Choose an assistant (↑/↓, Enter):".bold())?;

    let _raw = RawModeGuard::enable()?;
    let mut menu = MenuState::new(AgentMode::MENU.len());
    draw_menu(&mut out, &menu, false)?;

    let outcome = loop {
        let Event::Key(key) = event::read()? else { continue };
        if key.kind == KeyEventKind::Release {
            continue;
        }
        match menu.handle_key(key) {
            KeyOutcome::Continue => draw_menu(&mut out, &menu, true)?,
            KeyOutcome::Submit => break Prompted::Value(AgentMode::MENU[menu.selected()]),
            KeyOutcome::Cancel => break Prompted::Cancelled,
        }
    };

    queue!(out, Print("\r\n"))?;
    out.flush()?;
    Ok(outcome)
}

fn draw_menu(out: &mut impl Write, menu: &MenuState, redraw: bool) -> Result<()> {
    if redraw {
        queue!(out, MoveToPreviousLine(AgentMode::MENU.len() as u16))?;
    }
    for (i, mode) in AgentMode::MENU.iter().enumerate() {
        queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        if i == menu.selected() {
            queue!(
                out,
                Print("  ❯ ".cyan()),
                Print(mode.label().cyan().bold()),
                Print("  "),
                Print(mode.description().dim())
            )?;
        } else {
            queue!(out, Print("    "), Print(mode.label()))?;
        }
        queue!(out, Print("\r\n"))?;
    }
    out.flush()?;
    Ok(())
}

/// Fields of the company research form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyForm {
    pub name: String,
    pub website: String,
    pub focus: String,
}

impl CompanyForm {
    /// The research task for the agent; `None` without a company name.
    pub fn to_query(&self) -> Option<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }

        let mut query = format!("Research the company {name}");
        let website = self.website.trim();
        if !website.is_empty() {
            query.push_str(&format!(" (website: {website})"));
        }
        query.push('.');
        let focus = self.focus.trim();
        if !focus.is_empty() {
            query.push_str(&format!(" Focus especially on: {focus}."));
        }
        Some(query)
    }
}

/// Collect the company form field by field.
pub fn read_company_form() -> Result<Prompted<CompanyForm>> {
    let mut form = CompanyForm::default();
    let fields: [(&str, &str, &mut String); 3] = [
        ("Company name", "e.g. Anthropic", &mut form.name),
        ("Website (optional)", "e.g. anthropic.com", &mut form.website),
        ("Focus areas (optional)", "e.g. leadership, funding", &mut form.focus),
    ];

    let mut out = io::stdout();
    for (label, placeholder, value) in fields {
        writeln!(out, "{}", ui::paint(label.bold()))?;
        match read_line(placeholder)? {
            Prompted::Value(text) => *value = text,
            Prompted::Cancelled => return Ok(Prompted::Cancelled),
        }
    }
    Ok(Prompted::Value(form))
}
