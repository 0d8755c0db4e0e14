use std::fmt::{Display, Formatter};
use std::time::Duration;

use clap::ValueEnum;

use crate::llm::Provider;

/// Which assistant the CLI runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AgentMode {
    /// General web research with search and extract
    General,
    /// Structured company intelligence
    Company,
    /// Places and reviews from Google Maps
    Maps,
    /// Product comparison across Amazon and Walmart
    Ecommerce,
    /// Quick web search summary
    Search,
    /// Pick a mode from the query
    Auto,
}

/// Where an agent's tools come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    /// `nimble_search` / `nimble_extract` over the REST API
    Rest,
    /// Every tool the Nimble MCP server advertises
    Mcp,
}

impl AgentMode {
    /// Modes offered by the interactive menu, in display order.
    pub const MENU: [AgentMode; 6] = [
        AgentMode::General,
        AgentMode::Company,
        AgentMode::Maps,
        AgentMode::Ecommerce,
        AgentMode::Search,
        AgentMode::Auto,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgentMode::General => "General Question",
            AgentMode::Company => "Company Research",
            AgentMode::Maps => "Nimble-Maps Assistant",
            AgentMode::Ecommerce => "Nimble E-commerce Assistant",
            AgentMode::Search => "Quick Web Search",
            AgentMode::Auto => "Auto",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AgentMode::General => "Ask anything; answers cite live web sources",
            AgentMode::Company => "Overview, leadership, competitors and recent news",
            AgentMode::Maps => "Find places and collect their reviews",
            AgentMode::Ecommerce => "Compare products on Amazon and Walmart",
            AgentMode::Search => "Short summary of what the web says",
            AgentMode::Auto => "Let the router pick a mode from your query",
        }
    }

    pub fn default_provider(self) -> Provider {
        match self {
            AgentMode::General | AgentMode::Company | AgentMode::Auto => Provider::Anthropic,
            AgentMode::Maps | AgentMode::Ecommerce | AgentMode::Search => Provider::OpenAi,
        }
    }

    pub fn tool_source(self) -> ToolSource {
        match self {
            AgentMode::General | AgentMode::Company | AgentMode::Auto => ToolSource::Rest,
            AgentMode::Maps | AgentMode::Ecommerce | AgentMode::Search => ToolSource::Mcp,
        }
    }

    pub fn mcp_timeout(self) -> Duration {
        match self {
            AgentMode::Maps => Duration::from_secs(150),
            AgentMode::Ecommerce => Duration::from_secs(120),
            _ => Duration::from_secs(30),
        }
    }

    /// Query used when none is given on the command line.
    pub fn default_query(self) -> Option<&'static str> {
        match self {
            AgentMode::Maps => {
                Some("Find the top 3 Italian restaurants in Manhattan with at least 4.5 star rating.")
            }
            AgentMode::Ecommerce => Some(
                "Compare the best wireless earbuds under $150 with good battery life and sound quality.",
            ),
            AgentMode::Search => Some("latest developments in space exploration"),
            _ => None,
        }
    }

    /// Rewrite the user's query into the task sent to the agent.
    pub fn prepare_query(self, query: &str) -> String {
        let query = query.trim();
        match self {
            AgentMode::Maps if !query.to_lowercase().contains("review") => {
                format!("{query} Include reviews for each location.")
            }
            AgentMode::Search => format!("Search the web for information about: {query}"),
            _ => query.to_string(),
        }
    }

    /// Title of the banner printed before the assistant runs, if any.
    pub fn banner(self) -> Option<&'static str> {
        match self {
            AgentMode::Maps => Some("🌍 Nimble-Maps Assistant - Powered by Nimble's Location Intelligence"),
            AgentMode::Ecommerce => {
                Some("🛍️ Nimble E-commerce Assistant - Powered by Nimble's Cross-Retailer Intelligence")
            }
            _ => None,
        }
    }
}

impl Display for AgentMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_query_requests_reviews_once() {
        assert_eq!(
            AgentMode::Maps.prepare_query("coffee in Tel Aviv"),
            "coffee in Tel Aviv Include reviews for each location."
        );
        assert_eq!(
            AgentMode::Maps.prepare_query("coffee in Tel Aviv with Reviews"),
            "coffee in Tel Aviv with Reviews"
        );
    }

    #[test]
    fn test_search_query_wrapped() {
        assert_eq!(
            AgentMode::Search.prepare_query(" quantum computing "),
            "Search the web for information about: quantum computing"
        );
        assert_eq!(AgentMode::General.prepare_query("hello"), "hello");
    }

    #[test]
    fn test_mode_defaults() {
        assert_eq!(AgentMode::Company.default_provider(), Provider::Anthropic);
        assert_eq!(AgentMode::Ecommerce.default_provider(), Provider::OpenAi);
        assert_eq!(AgentMode::General.tool_source(), ToolSource::Rest);
        assert_eq!(AgentMode::Maps.tool_source(), ToolSource::Mcp);
        assert_eq!(AgentMode::Maps.mcp_timeout(), Duration::from_secs(150));
        assert!(AgentMode::General.default_query().is_none());
        assert!(AgentMode::Ecommerce.default_query().is_some());
    }
}
