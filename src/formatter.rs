use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Longest tool result preview shown in the terminal, in characters.
pub const RESULT_PREVIEW_CHARS: usize = 500;

// CSI and OSC escape sequences, then any remaining C0 control except \t and \n
static CONTROL_SEQUENCES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|[\x00-\x08\x0b-\x1f\x7f]")
        .expect("control sequence pattern is valid")
});

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line pattern is valid"));

pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Tool parameters as a single line of JSON.
    pub fn format_tool_input(&self, input: &Value) -> String {
        match input {
            Value::Null => "{}".to_string(),
            other => other.to_string(),
        }
    }

    /// Remote text made safe for the terminal: escape sequences removed and
    /// runs of blank lines collapsed.
    pub fn sanitize(&self, text: &str) -> String {
        let cleaned = CONTROL_SEQUENCES.replace_all(text, "");
        BLANK_RUNS.replace_all(&cleaned, "\n\n").into_owned()
    }

    /// Cut `text` to `limit` characters, appending `...` when it was longer.
    pub fn truncate(&self, text: &str, limit: usize) -> String {
        match text.char_indices().nth(limit) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        }
    }

    /// Sanitized, truncated preview of a tool result.
    pub fn result_preview(&self, content: &str) -> String {
        self.truncate(&self.sanitize(content), RESULT_PREVIEW_CHARS)
    }

    /// Flatten an MCP `CallToolResult` into plain text.
    pub fn mcp_result_text(&self, result: &Value) -> String {
        let Some(blocks) = result.get("content").and_then(Value::as_array) else {
            return match result {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
        };

        blocks
            .iter()
            .filter_map(|block| match block["type"].as_str() {
                Some("text") => block["text"].as_str().map(str::to_string),
                Some("image") | Some("audio") => Some(format!(
                    "[{}: {}]",
                    block["type"].as_str().unwrap_or_default(),
                    block["mimeType"].as_str().unwrap_or("unknown")
                )),
                Some("resource") => {
                    let resource = &block["resource"];
                    resource["text"]
                        .as_str()
                        .or_else(|| resource["uri"].as_str())
                        .map(str::to_string)
                }
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new()
    }
}
