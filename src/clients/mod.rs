// Clients for the hosted Nimble services
pub mod mcp;
pub mod nimble;

pub use mcp::{McpClient, McpTool};
pub use nimble::{ExtractParams, Focus, NimbleClient, SearchParams, TimeRange};
