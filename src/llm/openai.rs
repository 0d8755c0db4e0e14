//! OpenAI-compatible Chat Completions, including Azure OpenAI deployments.

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

pub struct OpenAi {
    client: Client,
    endpoint: String,
    headers: HeaderMap,
    model: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    tool_calls: Option<Vec<FunctionCall>>,
}

#[derive(Deserialize)]
struct FunctionCall {
    id: String,
    function: Function,
}

#[derive(Deserialize)]
struct Function {
    name: String,
    arguments: String,
}

impl OpenAi {
    /// OpenAI (or any compatible endpoint) with Bearer authentication.
    pub fn new(client: Client, base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let mut headers = json_headers();
        headers.insert(header::AUTHORIZATION, format!("Bearer {api_key}").parse()?);
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            headers,
            model: model.to_string(),
        })
    }

    /// An Azure OpenAI deployment, authenticated with the `api-key` header.
    pub fn azure(
        client: Client,
        endpoint: &str,
        deployment: &str,
        api_version: &str,
        api_key: &str,
    ) -> Result<Self> {
        let mut headers = json_headers();
        headers.insert(HeaderName::from_static("api-key"), api_key.parse()?);
        Ok(Self {
            client,
            endpoint: format!(
                "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
            headers,
            model: deployment.to_string(),
        })
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

#[async_trait]
impl ChatModel for OpenAi {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<Message> {
        let body = request_body(&self.model, request);
        tracing::trace!("openai request: {body}");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await?;
        let raw: CompletionResponse = serde_json::from_value(read_json("OpenAI", response).await?)?;
        let message = raw
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| anyhow::anyhow!("OpenAI returned no choices"))?;

        Ok(to_message(message))
    }
}

fn request_body(model: &str, request: &ChatRequest<'_>) -> Value {
    let mut messages = vec![json!({"role": "system", "content": request.system})];
    messages.extend(request.messages.iter().filter_map(convert_message));

    let mut body = json!({
        "model": model,
        "max_tokens": request.max_tokens,
        "messages": messages,
    });
    if !request.tools.is_empty() {
        body["tools"] = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    },
                })
            })
            .collect();
    }
    body
}

fn convert_message(message: &Message) -> Option<Value> {
    match message {
        Message::Human { content } => Some(json!({"role": "user", "content": content})),
        Message::Ai { content: Content::Text(text) } => {
            Some(json!({"role": "assistant", "content": text}))
        }
        Message::Ai { content } => {
            let text = content.text_parts().join("\n");
            let tool_calls: Vec<Value> = content
                .tool_calls()
                .into_iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {"name": call.name, "arguments": call.input.to_string()},
                    })
                })
                .collect();

            let content = if text.is_empty() { Value::Null } else { json!(text) };
            let mut out = json!({"role": "assistant", "content": content});
            if !tool_calls.is_empty() {
                out["tool_calls"] = Value::Array(tool_calls);
            }
            Some(out)
        }
        Message::Tool { tool_call_id, content, .. } => Some(json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": content,
        })),
        Message::System { .. } | Message::Unknown => None,
    }
}

fn to_message(message: AssistantMessage) -> Message {
    let text = message.content.unwrap_or_default();
    let tool_calls = message.tool_calls.unwrap_or_default();
    if tool_calls.is_empty() {
        return Message::ai_text(text);
    }

    let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
    if !text.is_empty() {
        blocks.push(ContentBlock::Text { text });
    }
    for call in tool_calls {
        let input = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
            tracing::warn!("unparseable arguments for {}: {e}", call.function.name);
            json!({})
        });
        blocks.push(ContentBlock::ToolUse {
            id: call.id,
            name: call.function.name,
            input,
        });
    }
    Message::ai_blocks(blocks)
}
