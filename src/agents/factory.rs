use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use reqwest::Client;

use super::{AgentMode, Toolbox, ToolSource, WebAgent, prompts};
use crate::clients::{McpClient, NimbleClient};
use crate::config::Config;
use crate::llm::{Anthropic, ChatModel, OpenAi, Provider};

/// Command-line choices that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct AgentOverrides {
    pub provider: Option<Provider>,
    pub model: Option<String>,
}

pub fn resolve_provider(config: &Config, mode: AgentMode, overrides: &AgentOverrides) -> Provider {
    overrides
        .provider
        .or(config.provider)
        .unwrap_or_else(|| mode.default_provider())
}

/// Fail early when a mode `auto` may route to has no key for its provider.
pub fn check_router_keys(config: &Config, overrides: &AgentOverrides) -> Result<()> {
    for mode in AgentMode::MENU.into_iter().filter(|m| *m != AgentMode::Auto) {
        config.api_key(resolve_provider(config, mode, overrides))?;
    }
    Ok(())
}

/// Client for request/response calls, bounded by the configured timeout.
pub fn http_client(config: &Config) -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?)
}

/// Client for long-lived event streams; only connecting is bounded.
pub fn streaming_client() -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()?)
}

pub fn build_model(
    config: &Config,
    provider: Provider,
    model: Option<&str>,
    client: Client,
) -> Result<Box<dyn ChatModel>> {
    let key = config.api_key(provider)?;
    let model = model.or(config.model.as_deref());

    Ok(match provider {
        Provider::Anthropic => Box::new(Anthropic::new(
            client,
            &config.anthropic_base_url,
            key,
            model.unwrap_or(provider.default_model()),
        )?),
        Provider::OpenAi => Box::new(OpenAi::new(
            client,
            &config.openai_base_url,
            key,
            model.unwrap_or(provider.default_model()),
        )?),
        Provider::Azure => Box::new(OpenAi::azure(
            client,
            config.azure_endpoint()?,
            model.unwrap_or(&config.azure_openai_deployment),
            &config.azure_openai_api_version,
            key,
        )?),
    })
}

/// Connect to the Nimble MCP server and run the handshake.
pub async fn connect_mcp(config: &Config, timeout: Duration) -> Result<McpClient> {
    McpClient::connect(
        streaming_client()?,
        &config.nimble_mcp_url,
        &config.nimble_api_key,
        timeout,
    )
    .await
}

pub async fn build_toolbox(config: &Config, mode: AgentMode, client: Client) -> Result<Toolbox> {
    match mode.tool_source() {
        ToolSource::Rest => Ok(Toolbox::new().with_nimble_rest(NimbleClient::new(
            client,
            &config.nimble_api_url,
            &config.nimble_api_key,
        ))),
        ToolSource::Mcp => {
            let mcp = connect_mcp(config, mode.mcp_timeout()).await?;
            let tools = mcp.list_tools().await?;
            if tools.is_empty() {
                bail!("MCP server {} advertised no tools", mcp.server_name());
            }
            tracing::info!("loaded {} tools from {}", tools.len(), mcp.server_name());
            Ok(Toolbox::new().with_mcp_tools(Arc::new(mcp), tools))
        }
    }
}

/// Build the agent for `mode`: model, tools and a system prompt dated today.
pub async fn build_agent(config: &Config, mode: AgentMode, overrides: &AgentOverrides) -> Result<WebAgent> {
    let provider = resolve_provider(config, mode, overrides);
    let client = http_client(config)?;
    let model = build_model(config, provider, overrides.model.as_deref(), client.clone())?;
    let toolbox = build_toolbox(config, mode, client).await?;

    let today = prompts::format_today(chrono::Local::now().date_naive());
    let system_prompt = prompts::system_prompt(mode, &today);
    tracing::info!("built {mode} agent on {provider}/{}", model.name());

    Ok(WebAgent::new(model, toolbox, system_prompt).with_limits(config.max_loops, config.max_tokens))
}
