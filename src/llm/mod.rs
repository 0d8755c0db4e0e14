// Chat model providers
pub mod anthropic;
pub mod openai;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::{Result, bail};
use async_trait::async_trait;
use clap::ValueEnum;
use reqwest::Response;
use serde_json::Value;

use crate::agents::{Message, ToolDefinition};

pub use anthropic::Anthropic;
pub use openai::OpenAi;

/// Hosted model vendors the agent can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI Chat Completions
    #[value(name = "openai")]
    OpenAi,
    /// Azure OpenAI deployment
    Azure,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-sonnet-4-5",
            Provider::OpenAi => "gpt-4.1",
            Provider::Azure => "gpt-4o",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::OpenAi => write!(f, "openai"),
            Provider::Azure => write!(f, "azure"),
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            "azure" | "azure-openai" => Ok(Provider::Azure),
            other => bail!("unknown provider {other:?} (expected anthropic, openai or azure)"),
        }
    }
}

/// Everything a model needs for one turn.
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
    pub max_tokens: u32,
}

/// One assistant turn against a hosted model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for display.
    fn name(&self) -> &str;

    /// Send the conversation and return the assistant's `ai` message.
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<Message>;
}

/// Read a JSON body, turning a non-2xx status into an error carrying the
/// vendor's message.
pub(crate) async fn read_json(vendor: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;
    tracing::trace!("{vendor} response: {text}");

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        bail!("{vendor} API error ({status}): {message}");
    }
    Ok(serde_json::from_str(&text)?)
}
