use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Instant;

use anyhow::Result;
use futures_util::{Stream, StreamExt};
use indicatif::ProgressBar;

use super::ui;
use crate::agents::{AgentStep, Content, Message};
use crate::formatter::ResponseFormatter;

const PROCESSING: &str = "Agent is processing...";

/// Renders agent messages as they stream in.
///
/// At most one spinner runs at a time and nothing is written while it runs.
/// Tool calls are timed from the moment they are announced until their
/// result arrives, keyed by tool-call id.
pub struct AgentResponseDisplay<W: Write> {
    out: W,
    spinner: Option<ProgressBar>,
    show_spinner: bool,
    tool_start_times: HashMap<String, Instant>,
    task_start: Instant,
    formatter: ResponseFormatter,
    width: usize,
}

impl<W: Write> AgentResponseDisplay<W> {
    pub fn new(out: W, show_spinner: bool, width: usize) -> Self {
        Self {
            out,
            spinner: None,
            show_spinner,
            tool_start_times: HashMap::new(),
            task_start: Instant::now(),
            formatter: ResponseFormatter::new(),
            width,
        }
    }

    pub fn start_processing(&mut self) {
        self.start_spinner(PROCESSING);
    }

    fn start_spinner(&mut self, message: &str) {
        self.stop_spinner();
        self.spinner = Some(ui::create_spinner(message, self.show_spinner));
    }

    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.spinner.is_some()
    }

    pub fn spinner_message(&self) -> Option<String> {
        self.spinner.as_ref().map(ProgressBar::message)
    }

    fn out(&mut self) -> &mut W {
        debug_assert!(self.spinner.is_none(), "output written under a running spinner");
        &mut self.out
    }

    pub fn handle_message(&mut self, message: &Message) -> io::Result<()> {
        match message {
            Message::Ai { content } => self.handle_ai(content),
            Message::Tool {
                name,
                tool_call_id,
                content,
            } => self.handle_tool(name, tool_call_id, content),
            Message::Human { .. } | Message::System { .. } | Message::Unknown => Ok(()),
        }
    }

    fn handle_ai(&mut self, content: &Content) -> io::Result<()> {
        self.stop_spinner();

        if let Content::Text(text) = content {
            let text = self.formatter.sanitize(text);
            ui::print_agent_text(self.out(), &text)?;
            return writeln!(self.out());
        }

        let text_parts = content.text_parts();
        if !text_parts.is_empty() {
            let text = self.formatter.sanitize(&text_parts.join("\n"));
            ui::print_agent_text(self.out(), &text)?;
            writeln!(self.out())?;
        }

        let calls = content.tool_calls();
        for call in &calls {
            self.tool_start_times.insert(call.id.clone(), Instant::now());
            let parameters = self.formatter.format_tool_input(&call.input);
            ui::print_tool_call(self.out(), &call.name, &parameters)?;
        }
        self.out().flush()?;

        if let Some(last) = calls.last() {
            self.start_spinner(&format!("Executing {}...", last.name));
        }
        Ok(())
    }

    fn handle_tool(&mut self, name: &str, tool_call_id: &str, content: &str) -> io::Result<()> {
        self.stop_spinner();

        let elapsed = self
            .tool_start_times
            .remove(tool_call_id)
            .map(|started| started.elapsed());
        let preview = self.formatter.result_preview(content);
        ui::print_tool_result(self.out(), name, &preview, elapsed)?;
        self.out().flush()?;

        self.start_spinner(PROCESSING);
        Ok(())
    }

    /// Stop the spinner and print the footer with the time since creation.
    pub fn finish(&mut self) -> io::Result<()> {
        self.stop_spinner();
        let (elapsed, width) = (self.task_start.elapsed(), self.width);
        ui::print_footer(self.out(), elapsed, width)?;
        self.out().flush()
    }
}

/// Drive `display` from a stream of conversation snapshots.
///
/// Each snapshot repeats everything before it, so only the messages past the
/// previous snapshot are rendered. An error ends the run with the spinner
/// stopped and no footer.
pub async fn render_steps<W, S>(display: &mut AgentResponseDisplay<W>, steps: S) -> Result<()>
where
    W: Write,
    S: Stream<Item = Result<AgentStep>>,
{
    let mut steps = std::pin::pin!(steps);
    display.start_processing();

    let mut last_index = 0;
    while let Some(step) = steps.next().await {
        let step = match step {
            Ok(step) => step,
            Err(e) => {
                display.stop_spinner();
                return Err(e);
            }
        };
        for message in step.messages.iter().skip(last_index) {
            display.handle_message(message)?;
        }
        last_index = step.messages.len();
    }

    display.finish()?;
    Ok(())
}

impl<W: Write> Drop for AgentResponseDisplay<W> {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}
