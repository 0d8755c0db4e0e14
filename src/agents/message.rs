use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the agent conversation, tagged the way the renderer
/// dispatches on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    System { content: String },
    Human { content: String },
    Ai { content: Content },
    Tool {
        name: String,
        tool_call_id: String,
        content: String,
    },
    #[serde(other)]
    Unknown,
}

/// Assistant content: a plain string or a list of typed blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Unknown,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human { content: content.into() }
    }

    pub fn ai_text(content: impl Into<String>) -> Self {
        Self::Ai { content: Content::Text(content.into()) }
    }

    pub fn ai_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self::Ai { content: Content::Blocks(blocks) }
    }

    pub fn tool(
        name: impl Into<String>,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            name: name.into(),
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Tool calls carried by an `ai` message, in block order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        match self {
            Self::Ai { content } => content.tool_calls(),
            _ => Vec::new(),
        }
    }
}

impl Content {
    /// Non-empty text blocks, in order.
    pub fn text_parts(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => vec![text.as_str()],
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } if !text.is_empty() => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    }),
                    _ => None,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ai_blocks_with_unknown_block() {
        let message: Message = serde_json::from_value(json!({
            "type": "ai",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Let me search."},
                {"type": "tool_use", "id": "toolu_1", "name": "nimble_search", "input": {"query": "rust"}}
            ]
        }))
        .unwrap();

        let Message::Ai { content } = &message else {
            panic!("expected ai message");
        };
        assert_eq!(content.text_parts(), vec!["Let me search."]);
        let calls = message.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "toolu_1");
        assert_eq!(calls[0].input["query"], "rust");
    }

    #[test]
    fn test_unrecognised_message_type() {
        let message: Message = serde_json::from_value(json!({"type": "function", "x": 1})).unwrap();
        assert_eq!(message, Message::Unknown);
        assert!(message.tool_calls().is_empty());
    }

    #[test]
    fn test_plain_text_content() {
        let message: Message = serde_json::from_value(json!({"type": "ai", "content": "hi"})).unwrap();
        assert_eq!(message, Message::ai_text("hi"));
    }
}
