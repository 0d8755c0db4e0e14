use std::time::Duration;

use anyhow::Result;
use swarms_rs::{llm::provider::openai::OpenAI, structs::agent::Agent};

use crate::agents::AgentMode;

const ROUTER_TIMEOUT: Duration = Duration::from_secs(30);

const ROUTER_PROMPT: &str = "You are a routing orchestrator that decides which assistant should handle a web research request.

When users ask about:
- A specific company, startup, its leadership, competitors or funding -> respond with 'USE_COMPANY'
- Places, restaurants, shops near a location, or reviews of places -> respond with 'USE_MAPS'
- Buying products, prices, deals, or comparing products on Amazon or Walmart -> respond with 'USE_ECOMMERCE'
- A quick lookup where a short summary is enough -> respond with 'USE_SEARCH'
- Anything else -> respond with 'USE_GENERAL'

Respond with the directive only.";

/// Directives the routing agent answers with, and the mode each selects.
const DIRECTIVES: [(&str, AgentMode); 5] = [
    ("USE_COMPANY", AgentMode::Company),
    ("USE_MAPS", AgentMode::Maps),
    ("USE_ECOMMERCE", AgentMode::Ecommerce),
    ("USE_SEARCH", AgentMode::Search),
    ("USE_GENERAL", AgentMode::General),
];

const MAPS_KEYWORDS: &[&str] = &[
    "review", "restaurant", "near ", "nearby", "cafe", "coffee shop", "hotel", "bar in",
];
const ECOMMERCE_KEYWORDS: &[&str] = &[
    "price", "buy", "cheapest", "compare products", "amazon", "walmart", "under $", "deal",
];
const COMPANY_KEYWORDS: &[&str] = &[
    "company", "startup", "competitors", "ceo", "founder", "funding",
];

/// Picks the assistant for `auto` mode.
pub struct ModeRouter {
    agent: Option<Box<dyn Agent>>,
}

impl ModeRouter {
    /// Uses a routing agent when an OpenAI key is available, keyword
    /// heuristics otherwise.
    pub fn new(openai_api_key: Option<&str>) -> Self {
        let agent = openai_api_key.map(|api_key| {
            let client = OpenAI::new(api_key.to_string()).set_model("gpt-4.1");
            let agent = client
                .agent_builder()
                .agent_name("ModeRouter")
                .system_prompt(ROUTER_PROMPT)
                .user_name("User")
                .max_loops(1)
                .temperature(0.0)
                .max_tokens(64)
                .build();
            Box::new(agent) as Box<dyn Agent>
        });
        Self { agent }
    }

    pub fn keywords_only() -> Self {
        Self { agent: None }
    }

    /// Resolve `query` to a concrete mode. Never returns `AgentMode::Auto`.
    pub async fn route(&mut self, query: &str) -> Result<AgentMode> {
        let Some(agent) = self.agent.as_mut() else {
            return Ok(classify_by_keywords(query));
        };

        let answer = tokio::time::timeout(ROUTER_TIMEOUT, agent.run(query.to_string())).await;
        let mode = match answer {
            Ok(Ok(response)) => parse_directive(&response).unwrap_or_else(|| {
                tracing::warn!("router gave no directive: {response}");
                classify_by_keywords(query)
            }),
            Ok(Err(e)) => {
                tracing::warn!("router failed: {e}");
                classify_by_keywords(query)
            }
            Err(_) => {
                tracing::warn!("router timed out after {}s", ROUTER_TIMEOUT.as_secs());
                classify_by_keywords(query)
            }
        };
        tracing::info!("routed query to {mode}");
        Ok(mode)
    }
}

/// The earliest `USE_<MODE>` directive in `response`, if any.
pub fn parse_directive(response: &str) -> Option<AgentMode> {
    let upper = response.to_uppercase();
    DIRECTIVES
        .iter()
        .filter_map(|(directive, mode)| upper.find(directive).map(|at| (at, *mode)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, mode)| mode)
}

pub fn classify_by_keywords(query: &str) -> AgentMode {
    let query = query.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| query.contains(k));

    if matches(MAPS_KEYWORDS) {
        AgentMode::Maps
    } else if matches(ECOMMERCE_KEYWORDS) {
        AgentMode::Ecommerce
    } else if matches(COMPANY_KEYWORDS) {
        AgentMode::Company
    } else {
        AgentMode::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directive() {
        assert_eq!(parse_directive("USE_MAPS"), Some(AgentMode::Maps));
        assert_eq!(parse_directive("use_ecommerce: best earbuds"), Some(AgentMode::Ecommerce));
        assert_eq!(
            parse_directive("USE_COMPANY, though USE_GENERAL could work"),
            Some(AgentMode::Company)
        );
        assert_eq!(parse_directive("I am not sure"), None);
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(classify_by_keywords("Best sushi restaurants in Brooklyn"), AgentMode::Maps);
        assert_eq!(classify_by_keywords("Cheapest 4K TV on Walmart"), AgentMode::Ecommerce);
        assert_eq!(classify_by_keywords("Who is the CEO of Anthropic?"), AgentMode::Company);
        assert_eq!(classify_by_keywords("Why is the sky blue?"), AgentMode::General);
    }

    #[tokio::test]
    async fn test_router_without_key_uses_keywords() {
        let mut router = ModeRouter::new(None);
        let mode = router.route("coffee shops near Union Square").await.unwrap();
        assert_eq!(mode, AgentMode::Maps);
    }
}
