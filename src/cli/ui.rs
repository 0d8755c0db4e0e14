use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::{
    execute,
    style::{StyledContent, Stylize},
    terminal::SetTitle,
};
use indicatif::{ProgressBar, ProgressStyle};

const BANNER_WIDTH: usize = 59;

static STYLED: AtomicBool = AtomicBool::new(true);

/// Turn colours and attributes off when stdout is not a terminal.
pub fn init_styling() {
    STYLED.store(io::stdout().is_terminal(), Ordering::Relaxed);
}

/// `content` with its styling, or just the text when styling is off.
pub fn paint<D: Display>(content: StyledContent<D>) -> String {
    render(content, STYLED.load(Ordering::Relaxed))
}

fn render<D: Display>(content: StyledContent<D>, styled: bool) -> String {
    if styled {
        content.to_string()
    } else {
        content.content().to_string()
    }
}

pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(columns, _)| columns as usize)
        .unwrap_or(80)
        .max(20)
}

pub fn set_title(title: &str) {
    let mut out = io::stdout();
    if !out.is_terminal() {
        return;
    }
    // Not every terminal supports titles
    let _ = execute!(out, SetTitle(title));
}

fn centered(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.chars().count()) / 2;
    format!("{}{text}", " ".repeat(pad))
}

fn boxed_line(text: &str) -> String {
    let len = text.chars().count();
    let left = BANNER_WIDTH.saturating_sub(len) / 2;
    let right = BANNER_WIDTH.saturating_sub(len + left);
    format!("║{}{text}{}║", " ".repeat(left), " ".repeat(right))
}

pub fn print_welcome(out: &mut impl Write, width: usize) -> io::Result<()> {
    let border = "═".repeat(BANNER_WIDTH);
    let blank = paint(centered(&boxed_line(""), width).cyan().bold());

    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "{}", paint(centered(&format!("╔{border}╗"), width).cyan().bold()))?;
    writeln!(out, "{blank}")?;
    writeln!(
        out,
        "{}",
        paint(centered(&boxed_line("🌐  N I M B L E   W E B   A G E N T  🤖"), width).white().bold())
    )?;
    writeln!(out, "{blank}")?;
    writeln!(
        out,
        "{}",
        paint(centered(&boxed_line("AI-Powered Web Research & Data Extraction"), width).magenta())
    )?;
    writeln!(out, "{blank}")?;
    writeln!(out, "{}", paint(centered(&format!("╚{border}╝"), width).cyan().bold()))?;
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        paint(
            centered("Powered by Nimble Web Intelligence • Claude • OpenAI", width)
                .dim()
                .italic()
        )
    )?;
    writeln!(out)
}

/// Title block printed before the maps and e-commerce assistants run.
pub fn print_assistant_banner(out: &mut impl Write, title: &str, width: usize) -> io::Result<()> {
    let rule = paint("=".repeat(title.chars().count().min(width).max(20)).cyan());
    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "{}", paint(title.bold()))?;
    writeln!(out, "{rule}")?;
    writeln!(out)
}

pub fn print_rule(out: &mut impl Write, width: usize) -> io::Result<()> {
    writeln!(out, "{}", paint("─".repeat(width).dark_grey()))
}

pub fn print_response_header(out: &mut impl Write, width: usize) -> io::Result<()> {
    let rule = paint("━".repeat(width).cyan());
    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "{}", paint(centered("✨ Agent Response", width).cyan().bold()))?;
    writeln!(out, "{rule}")?;
    writeln!(out)
}

pub fn print_agent_text(out: &mut impl Write, text: &str) -> io::Result<()> {
    writeln!(out, "{}", paint("Assistant:".dark_cyan()))?;
    writeln!(out, "{text}")
}

pub fn print_tool_call(out: &mut impl Write, name: &str, parameters: &str) -> io::Result<()> {
    writeln!(out, "{} {name}", paint("🔧 Calling tool:".yellow()))?;
    writeln!(out, "{} {parameters}", paint("Parameters:".dim()))?;
    writeln!(out)
}

pub fn print_tool_result(
    out: &mut impl Write,
    name: &str,
    preview: &str,
    elapsed: Option<Duration>,
) -> io::Result<()> {
    let label = paint(format!("Tool Result ({name}):").green());
    match elapsed {
        Some(elapsed) => writeln!(
            out,
            "{label} {}",
            paint(format!("({:.2}s)", elapsed.as_secs_f64()).dim())
        )?,
        None => writeln!(out, "{label}")?,
    }
    writeln!(out, "{}", paint(preview.dim()))?;
    writeln!(out)
}

pub fn print_footer(out: &mut impl Write, total: Duration, width: usize) -> io::Result<()> {
    let text = format!("Total processing time: {:.2}s", total.as_secs_f64());
    let pad = width.saturating_sub(text.chars().count());
    writeln!(out)?;
    writeln!(out, "{}", paint("─".repeat(width).dim()))?;
    writeln!(out, "{}{}", " ".repeat(pad), paint(text.dim().italic()))
}

pub fn print_info(out: &mut impl Write, text: &str) -> io::Result<()> {
    writeln!(out, "{}", paint(text.dim()))
}

pub fn print_success(out: &mut impl Write, text: &str) -> io::Result<()> {
    writeln!(out, "{}", paint(text.green()))
}

pub fn print_warning(out: &mut impl Write, text: &str) -> io::Result<()> {
    writeln!(out, "{}", paint(text.yellow()))
}

pub fn print_error(out: &mut impl Write, text: &str) -> io::Result<()> {
    writeln!(out, "{}", paint(text.red()))
}

/// A `dots` spinner on stderr, or a hidden one that draws nothing.
pub fn create_spinner(message: &str, visible: bool) -> ProgressBar {
    if !visible {
        let spinner = ProgressBar::hidden();
        spinner.set_message(message.to_string());
        return spinner;
    }

    let style = ProgressStyle::with_template("{spinner:.cyan} {msg:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    let spinner = ProgressBar::new_spinner().with_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

#[cfg(test)]
pub(crate) fn plain(bytes: &[u8]) -> String {
    crate::formatter::ResponseFormatter::new().sanitize(&String::from_utf8_lossy(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_elapsed() {
        let mut out = Vec::new();
        print_tool_result(&mut out, "nimble_search", "[...]", Some(Duration::from_millis(1234))).unwrap();
        let text = plain(&out);
        assert!(text.starts_with("Tool Result (nimble_search): (1.23s)\n[...]\n"));

        let mut out = Vec::new();
        print_tool_result(&mut out, "nimble_search", "[...]", None).unwrap();
        assert!(plain(&out).starts_with("Tool Result (nimble_search):\n"));
    }

    #[test]
    fn test_footer_right_aligned() {
        let mut out = Vec::new();
        print_footer(&mut out, Duration::from_millis(2500), 40).unwrap();
        let text = plain(&out);
        let last = text.lines().last().unwrap();
        assert_eq!(last.chars().count(), 40);
        assert!(last.ends_with("Total processing time: 2.50s"));
    }

    #[test]
    fn test_welcome_box() {
        let mut out = Vec::new();
        print_welcome(&mut out, 80).unwrap();
        let text = plain(&out);
        assert!(text.contains("N I M B L E   W E B   A G E N T"));
        assert!(text.contains("AI-Powered Web Research & Data Extraction"));
    }

    #[test]
    fn test_plain_output_off_terminal() {
        assert_eq!(render("Tool Result:".green().bold(), false), "Tool Result:");
        let styled = render("Tool Result:".green().bold(), true);
        assert!(styled.starts_with('\x1b'));
        assert!(styled.contains("Tool Result:"));
    }

    #[test]
    fn test_hidden_spinner_keeps_message() {
        let spinner = create_spinner("Agent is processing...", false);
        assert_eq!(spinner.message(), "Agent is processing...");
        spinner.finish_and_clear();
    }
}
