// Agent loop, its tools and the per-mode setup
#[cfg(test)]
pub(crate) mod fakes;
pub mod factory;
pub mod message;
pub mod profiles;
pub mod prompts;
pub mod tools;
pub mod web_agent;

pub use factory::{AgentOverrides, build_agent};
pub use message::{Content, ContentBlock, Message, ToolCall};
pub use profiles::{AgentMode, ToolSource};
pub use tools::{ToolDefinition, ToolHandler, Toolbox};
pub use web_agent::{AgentStep, WebAgent};
