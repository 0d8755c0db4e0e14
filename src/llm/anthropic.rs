//! Anthropic Messages API.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ChatModel, ChatRequest, read_json};
use crate::agents::{Content, ContentBlock, Message};

const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    client: Client,
    endpoint: String,
    headers: HeaderMap,
    model: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

impl Anthropic {
    pub fn new(client: Client, base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(HeaderName::from_static("x-api-key"), api_key.parse()?);

        Ok(Self {
            client,
            endpoint: format!("{}/messages", base_url.trim_end_matches('/')),
            headers,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ChatModel for Anthropic {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<Message> {
        let body = request_body(&self.model, request);
        tracing::trace!("anthropic request: {body}");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await?;
        let raw: MessagesResponse = serde_json::from_value(read_json("Anthropic", response).await?)?;
        tracing::debug!("anthropic stop reason: {:?}", raw.stop_reason);

        Ok(Message::ai_blocks(raw.content))
    }
}

fn request_body(model: &str, request: &ChatRequest<'_>) -> Value {
    let mut body = json!({
        "model": model,
        "max_tokens": request.max_tokens,
        "system": request.system,
        "messages": convert_messages(request.messages),
    });
    if !request.tools.is_empty() {
        body["tools"] = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect();
    }
    body
}

/// Convert the conversation to Anthropic content-block form. Consecutive
/// tool results share one `user` message.
fn convert_messages(messages: &[Message]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();

    for message in messages {
        match message {
            Message::Human { content } => out.push(json!({"role": "user", "content": content})),
            Message::Ai { content } => {
                if let Some(content) = assistant_content(content) {
                    out.push(json!({"role": "assistant", "content": content}));
                }
            }
            Message::Tool { tool_call_id, content, .. } => {
                let block = json!({
                    "type": "tool_result",
                    "tool_use_id": tool_call_id,
                    "content": content,
                });
                let open = out
                    .last_mut()
                    .filter(|last| last["role"] == "user")
                    .and_then(|last| last["content"].as_array_mut());
                match open {
                    Some(blocks) => blocks.push(block),
                    None => out.push(json!({"role": "user", "content": [block]})),
                }
            }
            Message::System { .. } | Message::Unknown => {}
        }
    }
    out
}

fn assistant_content(content: &Content) -> Option<Value> {
    match content {
        Content::Text(text) if text.is_empty() => None,
        Content::Text(text) => Some(json!(text)),
        Content::Blocks(blocks) => {
            let blocks: Vec<Value> = blocks
                .iter()
                .filter(|block| match block {
                    ContentBlock::Text { text } => !text.is_empty(),
                    ContentBlock::ToolUse { .. } => true,
                    ContentBlock::Unknown => false,
                })
                .filter_map(|block| serde_json::to_value(block).ok())
                .collect();
            (!blocks.is_empty()).then(|| Value::Array(blocks))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::ToolDefinition;

    #[test]
    fn test_tool_results_grouped_into_one_user_turn() {
        let messages = vec![
            Message::human("weather and news?"),
            Message::ai_blocks(vec![
                ContentBlock::Text { text: "Searching.".to_string() },
                ContentBlock::ToolUse {
                    id: "a".to_string(),
                    name: "nimble_search".to_string(),
                    input: json!({"query": "weather"}),
                },
                ContentBlock::ToolUse {
                    id: "b".to_string(),
                    name: "nimble_search".to_string(),
                    input: json!({"query": "news"}),
                },
            ]),
            Message::tool("nimble_search", "a", "sunny"),
            Message::tool("nimble_search", "b", "quiet"),
        ];

        let converted = convert_messages(&messages);
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0], json!({"role": "user", "content": "weather and news?"}));
        assert_eq!(converted[1]["content"][1]["type"], "tool_use");
        assert_eq!(converted[1]["content"][1]["input"]["query"], "weather");

        let results = converted[2]["content"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["tool_use_id"], "a");
        assert_eq!(results[1]["content"], "quiet");
    }

    #[test]
    fn test_request_body_tools_and_system() {
        let tools = vec![ToolDefinition {
            name: "nimble_extract".to_string(),
            description: "Extract".to_string(),
            input_schema: json!({"type": "object"}),
        }];
        let messages = vec![Message::human("hi")];
        let request = ChatRequest {
            system: "be brief",
            messages: &messages,
            tools: &tools,
            max_tokens: 1024,
        };

        let body = request_body("claude-sonnet-4-5", &request);
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");

        let bare = ChatRequest { tools: &[], ..request };
        assert!(request_body("m", &bare).get("tools").is_none());
    }

    #[test]
    fn test_empty_assistant_turn_dropped() {
        let converted = convert_messages(&[
            Message::human("hi"),
            Message::ai_blocks(vec![ContentBlock::Unknown]),
        ]);
        assert_eq!(converted.len(), 1);
    }
}
