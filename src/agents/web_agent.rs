use anyhow::{Result, anyhow};
use async_stream::try_stream;
use futures_util::{Stream, future::join_all};

use super::{Message, Toolbox};
use crate::llm::{ChatModel, ChatRequest};

/// Snapshot of the whole conversation after one agent step.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStep {
    pub messages: Vec<Message>,
}

/// A tool-calling agent: the model answers, requested tools run, their
/// results go back to the model, until it answers without calling tools.
pub struct WebAgent {
    model: Box<dyn ChatModel>,
    toolbox: Toolbox,
    system_prompt: String,
    max_loops: u32,
    max_tokens: u32,
}

impl WebAgent {
    pub fn new(model: Box<dyn ChatModel>, toolbox: Toolbox, system_prompt: impl Into<String>) -> Self {
        Self {
            model,
            toolbox,
            system_prompt: system_prompt.into(),
            max_loops: 25,
            max_tokens: 4096,
        }
    }

    pub fn with_limits(mut self, max_loops: u32, max_tokens: u32) -> Self {
        self.max_loops = max_loops.max(1);
        self.max_tokens = max_tokens;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Run the agent on `query`, yielding the message list after every step.
    ///
    /// The first snapshot holds only the human message. Tool calls of one
    /// model turn run concurrently; their results are appended in call order
    /// and a failing tool becomes an `Error: ...` result instead of ending
    /// the run.
    pub fn stream(&self, query: &str) -> impl Stream<Item = Result<AgentStep>> + '_ {
        let query = query.to_string();
        let tools = self.toolbox.definitions();

        try_stream! {
            let mut messages = vec![Message::human(query)];
            yield AgentStep { messages: messages.clone() };

            for turn in 1..=self.max_loops {
                tracing::debug!("agent turn {turn} with {} messages", messages.len());
                let reply = {
                    let request = ChatRequest {
                        system: &self.system_prompt,
                        messages: &messages,
                        tools: &tools,
                        max_tokens: self.max_tokens,
                    };
                    self.model.complete(&request).await?
                };

                let calls = reply.tool_calls();
                messages.push(reply);
                yield AgentStep { messages: messages.clone() };

                if calls.is_empty() {
                    return;
                }

                let results = join_all(
                    calls
                        .iter()
                        .map(|call| self.toolbox.call(&call.name, call.input.clone())),
                )
                .await;

                for (call, result) in calls.into_iter().zip(results) {
                    let content = match result {
                        Ok(content) => content,
                        Err(e) => {
                            tracing::warn!("tool {} failed: {e:#}", call.name);
                            format!("Error: {e:#}")
                        }
                    };
                    messages.push(Message::tool(call.name, call.id, content));
                }
                yield AgentStep { messages: messages.clone() };
            }

            Err::<(), _>(anyhow!(
                "agent stopped after {} turns without a final answer",
                self.max_loops
            ))?;
        }
    }
}
