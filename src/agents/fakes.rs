//! Scripted model and tool used by agent and renderer tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ContentBlock, Message, ToolDefinition, ToolHandler, Toolbox};
use crate::llm::{ChatModel, ChatRequest};

/// Answers with the given replies in order, then fails.
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
}

impl ScriptedModel {
    pub(crate) fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: &ChatRequest<'_>) -> Result<Message> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("no more replies"))
    }
}

/// Uppercases `input.text`.
pub(crate) struct Upper;

#[async_trait]
impl ToolHandler for Upper {
    async fn call(&self, input: Value) -> Result<String> {
        match input["text"].as_str() {
            Some(text) => Ok(text.to_uppercase()),
            None => Err(anyhow!("missing text")),
        }
    }
}

pub(crate) fn toolbox() -> Toolbox {
    let mut toolbox = Toolbox::new();
    toolbox.register(
        ToolDefinition {
            name: "upper".to_string(),
            description: "Uppercase text".to_string(),
            input_schema: json!({"type": "object"}),
        },
        Arc::new(Upper),
    );
    toolbox
}

pub(crate) fn tool_use(id: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: "upper".to_string(),
        input,
    }
}
