pub mod agents;
pub mod cli;
pub mod clients;
pub mod config;
pub mod formatter;
pub mod llm;
pub mod logging;
pub mod orchestrator;

pub use agents::{AgentMode, AgentStep, Message, WebAgent, build_agent};
pub use cli::{App, Cli};
pub use config::Config;
pub use formatter::ResponseFormatter;
pub use orchestrator::ModeRouter;
