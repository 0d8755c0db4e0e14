use std::env;
use anyhow::{Result, anyhow, bail};

use crate::llm::Provider;

pub const DEFAULT_NIMBLE_API_URL: &str = "https://nimble-retriever.webit.live";
pub const DEFAULT_NIMBLE_MCP_URL: &str = "https://mcp.nimbleway.com/sse";

#[derive(Debug, Clone)]
pub struct Config {
    // Nimble
    pub nimble_api_key: String,
    pub nimble_api_url: String,
    pub nimble_mcp_url: String,

    // Anthropic
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,

    // OpenAI
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,

    // Azure OpenAI
    pub azure_openai_api_key: Option<String>,
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_deployment: String,
    pub azure_openai_api_version: String,

    // Agent Configuration
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub max_loops: u32,
    pub request_timeout_secs: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let nimble_api_key = get("NIMBLE_API_KEY")
            .ok_or_else(|| anyhow!("NIMBLE_API_KEY environment variable is required"))?;

        let provider = match get("AGENT_PROVIDER") {
            Some(name) => Some(name.parse::<Provider>()?),
            None => None,
        };

        Ok(Self {
            nimble_api_key,
            nimble_api_url: get("NIMBLE_API_URL")
                .unwrap_or_else(|| DEFAULT_NIMBLE_API_URL.to_string()),
            nimble_mcp_url: get("NIMBLE_MCP_URL")
                .unwrap_or_else(|| DEFAULT_NIMBLE_MCP_URL.to_string()),

            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_base_url: get("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| "https://api.anthropic.com/v1".to_string()),

            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),

            azure_openai_api_key: get("AZURE_OPENAI_API_KEY"),
            azure_openai_endpoint: get("AZURE_OPENAI_ENDPOINT"),
            azure_openai_deployment: get("AZURE_OPENAI_DEPLOYMENT")
                .unwrap_or_else(|| "gpt-4o".to_string()),
            azure_openai_api_version: get("OPENAI_API_VERSION")
                .unwrap_or_else(|| "2024-06-01".to_string()),

            provider,
            model: get("AGENT_MODEL"),
            max_tokens: get("MAX_TOKENS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(4096),
            max_loops: get("MAX_LOOPS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(25),
            request_timeout_secs: get("REQUEST_TIMEOUT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),

            log_level: get("RUST_LOG").unwrap_or_else(|| "warn".to_string()),
        })
    }

    /// The API key for `provider`, or an error naming the variable to set.
    pub fn api_key(&self, provider: Provider) -> Result<&str> {
        let (key, var) = match provider {
            Provider::Anthropic => (&self.anthropic_api_key, "ANTHROPIC_API_KEY"),
            Provider::OpenAi => (&self.openai_api_key, "OPENAI_API_KEY"),
            Provider::Azure => (&self.azure_openai_api_key, "AZURE_OPENAI_API_KEY"),
        };
        key.as_deref()
            .ok_or_else(|| anyhow!("{var} environment variable is required for the {provider} provider"))
    }

    pub fn azure_endpoint(&self) -> Result<&str> {
        match self.azure_openai_endpoint.as_deref() {
            Some(endpoint) => Ok(endpoint),
            None => bail!("AZURE_OPENAI_ENDPOINT environment variable is required for the azure provider"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_nimble_key_fails_fast() {
        let err = Config::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "sk")])).unwrap_err();
        assert!(err.to_string().contains("NIMBLE_API_KEY"));

        let err = Config::from_lookup(lookup(&[("NIMBLE_API_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("NIMBLE_API_KEY"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("NIMBLE_API_KEY", "nk")])).unwrap();
        assert_eq!(config.nimble_api_key, "nk");
        assert_eq!(config.nimble_mcp_url, DEFAULT_NIMBLE_MCP_URL);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.max_loops, 25);
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.log_level, "warn");
        assert!(config.provider.is_none());
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("NIMBLE_API_KEY", "nk"),
            ("MAX_LOOPS", "lots"),
            ("MAX_TOKENS", "1024"),
        ]))
        .unwrap();
        assert_eq!(config.max_loops, 25);
        assert_eq!(config.max_tokens, 1024);
    }

    #[test]
    fn test_provider_parsing() {
        let config = Config::from_lookup(lookup(&[
            ("NIMBLE_API_KEY", "nk"),
            ("AGENT_PROVIDER", "OpenAI"),
        ]))
        .unwrap();
        assert_eq!(config.provider, Some(Provider::OpenAi));

        assert!(
            Config::from_lookup(lookup(&[("NIMBLE_API_KEY", "nk"), ("AGENT_PROVIDER", "bard")]))
                .is_err()
        );
    }

    #[test]
    fn test_api_key_names_missing_variable() {
        let config = Config::from_lookup(lookup(&[
            ("NIMBLE_API_KEY", "nk"),
            ("ANTHROPIC_API_KEY", "ak"),
        ]))
        .unwrap();
        assert_eq!(config.api_key(Provider::Anthropic).unwrap(), "ak");
        let err = config.api_key(Provider::OpenAi).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert!(config.azure_endpoint().is_err());
    }
}
