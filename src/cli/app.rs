use std::io::{self, Stdout, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::style::Stylize;
use serde_json::{Value, json};

use super::args::{Action, Cli};
use super::display::{AgentResponseDisplay, render_steps};
use super::prompt::{self, Prompted};
use super::ui;
use crate::agents::{AgentMode, WebAgent, build_agent, factory};
use crate::config::Config;
use crate::formatter::ResponseFormatter;
use crate::logging;
use crate::orchestrator::ModeRouter;

const PLACEHOLDER: &str = "Enter your task...";

/// One CLI run. Every failure is reported on the terminal; `run` itself only
/// fails when the terminal cannot be written to.
pub struct App {
    cli: Cli,
    out: Stdout,
    width: usize,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        ui::init_styling();
        Self {
            cli,
            out: io::stdout(),
            width: ui::terminal_width(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        match self.cli.action() {
            Action::Search(query) => self.run_search(&query).await,
            Action::ListTools => self.run_tools().await,
            Action::Agent => self.run_agent().await,
        }
    }

    fn config_or_report(&mut self) -> Result<Option<Config>> {
        match load_config() {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                ui::print_error(&mut self.out, &format!("Error: {e:#}"))?;
                Ok(None)
            }
        }
    }

    async fn run_agent(&mut self) -> Result<()> {
        ui::set_title("Nimble Web Agent");
        ui::print_welcome(&mut self.out, self.width)?;

        let mode = match self.cli.mode {
            Some(mode) => mode,
            None => match prompt::select_mode()? {
                Prompted::Value(mode) => mode,
                Prompted::Cancelled => return self.cancelled(),
            },
        };

        ui::print_info(&mut self.out, "Initializing agent...")?;
        let config = match load_config() {
            Ok(config) => config,
            Err(e) => return self.init_failed(e),
        };
        // Auto builds its agent once the query has been routed
        let agent = if mode == AgentMode::Auto {
            if let Err(e) = factory::check_router_keys(&config, &self.cli.overrides()) {
                return self.init_failed(e);
            }
            None
        } else {
            match build_agent(&config, mode, &self.cli.overrides()).await {
                Ok(agent) => Some(agent),
                Err(e) => return self.init_failed(e),
            }
        };
        ui::print_success(&mut self.out, ready_message(mode))?;
        writeln!(self.out)?;

        let Some(query) = self.read_query(mode)? else {
            return Ok(());
        };

        let (mode, agent) = match agent {
            Some(agent) => (mode, agent),
            None => {
                let routed = ModeRouter::new(config.openai_api_key.as_deref())
                    .route(&query)
                    .await?;
                ui::print_info(&mut self.out, &format!("Routing to {routed}"))?;
                match build_agent(&config, routed, &self.cli.overrides()).await {
                    Ok(agent) => (routed, agent),
                    Err(e) => return self.init_failed(e),
                }
            }
        };

        if let Some(banner) = mode.banner() {
            ui::print_assistant_banner(&mut self.out, banner, self.width)?;
        }

        let task = mode.prepare_query(&query);
        if let Err(e) = self.stream_response(&agent, &task).await {
            ui::print_error(&mut self.out, &format!("Error: {e:#}"))?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    /// Query from the command line, the company form or the prompt.
    /// `None` after the reason was printed.
    fn read_query(&mut self, mode: AgentMode) -> Result<Option<String>> {
        if let Some(query) = self.cli.query_text() {
            return Ok(Some(query));
        }

        ui::print_rule(&mut self.out, self.width)?;
        let entered = if mode == AgentMode::Company {
            match prompt::read_company_form()? {
                Prompted::Value(form) => form.to_query().unwrap_or_default(),
                Prompted::Cancelled => {
                    self.cancelled()?;
                    return Ok(None);
                }
            }
        } else {
            match prompt::read_line(PLACEHOLDER)? {
                Prompted::Value(text) => text,
                Prompted::Cancelled => {
                    self.cancelled()?;
                    return Ok(None);
                }
            }
        };

        let entered = entered.trim();
        if !entered.is_empty() {
            return Ok(Some(entered.to_string()));
        }
        if let Some(example) = mode.default_query() {
            ui::print_info(&mut self.out, &format!("Using example query: {example}"))?;
            return Ok(Some(example.to_string()));
        }
        ui::print_warning(&mut self.out, "No task provided")?;
        Ok(None)
    }

    async fn stream_response(&mut self, agent: &WebAgent, query: &str) -> Result<()> {
        ui::print_response_header(&mut self.out, self.width)?;

        let mut display = AgentResponseDisplay::new(io::stdout(), !self.cli.no_spinner, self.width);
        render_steps(&mut display, agent.stream(query)).await
    }

    async fn run_search(&mut self, query: &str) -> Result<()> {
        let Some(config) = self.config_or_report()? else {
            return Ok(());
        };
        ui::print_info(
            &mut self.out,
            &format!("Searching for '{query}' - This may take a few moments..."),
        )?;

        let spinner = ui::create_spinner("Searching...", !self.cli.no_spinner);
        let result = deep_web_search(&config, query).await;
        spinner.finish_and_clear();

        match result {
            Ok(result) => {
                let formatter = ResponseFormatter::new();
                writeln!(self.out, "{}", formatter.sanitize(&formatter.mcp_result_text(&result)))?;
            }
            Err(e) => ui::print_error(&mut self.out, &format!("Error: {e:#}"))?,
        }
        Ok(())
    }

    async fn run_tools(&mut self) -> Result<()> {
        let Some(config) = self.config_or_report()? else {
            return Ok(());
        };

        let timeout = Duration::from_secs(config.request_timeout_secs);
        let listed = match factory::connect_mcp(&config, timeout).await {
            Ok(mcp) => mcp
                .list_tools()
                .await
                .map(|tools| (mcp.server_name().to_string(), tools)),
            Err(e) => Err(e),
        };

        match listed {
            Ok((server, tools)) => {
                ui::print_success(&mut self.out, &format!("✓ Connected to {server}"))?;
                writeln!(self.out)?;
                for tool in tools {
                    writeln!(self.out, "{}", ui::paint(tool.name.as_str().yellow().bold()))?;
                    if !tool.description.is_empty() {
                        writeln!(self.out, "  {}", ui::paint(tool.description.trim().dim()))?;
                    }
                }
            }
            Err(e) => ui::print_error(&mut self.out, &format!("Error: {e:#}"))?,
        }
        Ok(())
    }

    fn cancelled(&mut self) -> Result<()> {
        writeln!(self.out)?;
        ui::print_warning(&mut self.out, "Cancelled")?;
        Ok(())
    }

    fn init_failed(&mut self, e: anyhow::Error) -> Result<()> {
        ui::print_error(&mut self.out, &format!("Failed to initialize agent: {e:#}"))?;
        Ok(())
    }
}

fn ready_message(mode: AgentMode) -> &'static str {
    match mode {
        AgentMode::Auto => "✓ Router ready!",
        _ => "✓ Agent ready!",
    }
}

/// Load the environment and start logging at its level.
fn load_config() -> Result<Config> {
    let config = Config::from_env()?;
    logging::init(&config.log_level);
    Ok(config)
}

async fn deep_web_search(config: &Config, query: &str) -> Result<Value> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let mcp = factory::connect_mcp(config, timeout).await?;
    mcp.call_tool("nimble_deep_web_search", json!({ "query": query })).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_message_names_what_was_built() {
        assert_eq!(ready_message(AgentMode::Auto), "✓ Router ready!");
        for mode in AgentMode::MENU.into_iter().filter(|m| *m != AgentMode::Auto) {
            assert_eq!(ready_message(mode), "✓ Agent ready!");
        }
    }
}
