use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde_json::Value;

use crate::clients::{ExtractParams, McpClient, McpTool, NimbleClient, SearchParams};
use crate::formatter::ResponseFormatter;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Executes one named tool with model-supplied JSON input.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, input: Value) -> Result<String>;
}

/// The set of tools an agent may call, keyed by tool name.
#[derive(Default, Clone)]
pub struct Toolbox {
    tools: BTreeMap<String, (ToolDefinition, Arc<dyn ToolHandler>)>,
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) {
        self.tools.insert(definition.name.clone(), (definition, handler));
    }

    /// Register `nimble_search` and `nimble_extract` backed by the REST API.
    pub fn with_nimble_rest(mut self, client: NimbleClient) -> Self {
        let client = Arc::new(client);
        self.register(
            ToolDefinition {
                name: "nimble_search".to_string(),
                description: "Search the web with Nimble. Returns ranked results with titles, \
                              URLs and descriptions; with deep_search it also returns the \
                              extracted page content."
                    .to_string(),
                input_schema: input_schema::<SearchParams>(),
            },
            Arc::new(SearchTool { client: client.clone() }),
        );
        self.register(
            ToolDefinition {
                name: "nimble_extract".to_string(),
                description: "Extract the content of specific web pages by URL.".to_string(),
                input_schema: input_schema::<ExtractParams>(),
            },
            Arc::new(ExtractTool { client }),
        );
        self
    }

    /// Register every tool the MCP server advertises.
    pub fn with_mcp_tools(mut self, client: Arc<McpClient>, tools: Vec<McpTool>) -> Self {
        for tool in tools {
            let handler = McpToolHandler {
                client: client.clone(),
                name: tool.name.clone(),
            };
            self.register(
                ToolDefinition {
                    name: tool.name,
                    description: tool.description,
                    input_schema: tool.input_schema,
                },
                Arc::new(handler),
            );
        }
        self
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|(definition, _)| definition.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub async fn call(&self, name: &str, input: Value) -> Result<String> {
        let (_, handler) = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow!("unknown tool: {name}"))?;
        tracing::debug!("calling tool {name}");
        handler.call(input).await
    }
}

/// JSON schema for a parameter type, without the `$schema` marker.
fn input_schema<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    schema
}

struct SearchTool {
    client: Arc<NimbleClient>,
}

#[async_trait]
impl ToolHandler for SearchTool {
    async fn call(&self, input: Value) -> Result<String> {
        let params: SearchParams = serde_json::from_value(input)?;
        let result = self.client.search(&params).await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

struct ExtractTool {
    client: Arc<NimbleClient>,
}

#[async_trait]
impl ToolHandler for ExtractTool {
    async fn call(&self, input: Value) -> Result<String> {
        let params: ExtractParams = serde_json::from_value(input)?;
        let result = self.client.extract(&params).await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

struct McpToolHandler {
    client: Arc<McpClient>,
    name: String,
}

#[async_trait]
impl ToolHandler for McpToolHandler {
    async fn call(&self, input: Value) -> Result<String> {
        let result = self.client.call_tool(&self.name, input).await?;
        Ok(ResponseFormatter::new().mcp_result_text(&result))
    }
}
