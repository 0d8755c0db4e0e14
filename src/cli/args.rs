use clap::Parser;

use crate::agents::{AgentMode, AgentOverrides};
use crate::llm::Provider;

/// Web research agent powered by Nimble web intelligence.
#[derive(Debug, Parser)]
#[command(name = "nimble-agent", version, about)]
pub struct Cli {
    /// Assistant to run; shows a menu when omitted in a terminal
    #[arg(short, long, value_enum)]
    pub mode: Option<AgentMode>,

    /// Model vendor, overriding AGENT_PROVIDER and the mode default
    #[arg(short, long, value_enum)]
    pub provider: Option<Provider>,

    /// Model name (or Azure deployment), overriding AGENT_MODEL
    #[arg(long)]
    pub model: Option<String>,

    /// Do not animate status spinners
    #[arg(long)]
    pub no_spinner: bool,

    /// Run one deep web search on the Nimble MCP server and print the results
    #[arg(
        long,
        value_name = "QUERY",
        num_args = 0..=1,
        default_missing_value = DEFAULT_SEARCH_QUERY,
        conflicts_with_all = ["list_tools", "query"]
    )]
    pub search: Option<String>,

    /// List the tools the Nimble MCP server offers
    #[arg(long, conflicts_with = "query")]
    pub list_tools: bool,

    /// Task for the agent; prompts for one when omitted
    pub query: Vec<String>,
}

pub const DEFAULT_SEARCH_QUERY: &str = "recent advances in artificial intelligence";

/// What a run does, decided by the flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Agent,
    Search(String),
    ListTools,
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.list_tools {
            return Action::ListTools;
        }
        match self.search.as_deref().map(str::trim) {
            Some("") => Action::Search(DEFAULT_SEARCH_QUERY.to_string()),
            Some(query) => Action::Search(query.to_string()),
            None => Action::Agent,
        }
    }

    /// Positional words joined into one task, if any were given.
    pub fn query_text(&self) -> Option<String> {
        let query = self.query.join(" ");
        let query = query.trim();
        (!query.is_empty()).then(|| query.to_string())
    }

    pub fn overrides(&self) -> AgentOverrides {
        AgentOverrides {
            provider: self.provider,
            model: self.model.clone(),
        }
    }
}
