//! MCP (Model Context Protocol) server core.
//!
//! Provides a JSON-RPC 2.0 interface over stdio so that AI-assistant hosts
//! can discover and invoke registered tools and retrieve parametrized
//! prompts. Invocation outcomes are aggregated by the server's metrics
//! collector. Tool handlers are supplied by the embedding toolkit; the core
//! forwards their arguments opaquely.

/// Cooperative cancellation token for tool handlers.
pub mod cancel;

/// Prompt records and the prompt registry.
pub mod prompts;

/// Typed per-method request decoding.
pub mod request;

/// Server, dispatcher, and transport loop.
pub mod server;

/// Tool records and the tool registry.
pub mod tools;

/// JSON-RPC 2.0 wire types.
pub mod transport;

pub use cancel::CancellationToken;
pub use prompts::{Prompt, PromptArgument, PromptRegistry};
pub use request::{McpRequest, PromptGetParams, ToolCallParams};
pub use server::{McpServer, McpServerBuilder, PROTOCOL_VERSION, STATS_TOOL_NAME};
pub use tools::{Tool, ToolDefinition, ToolHandler, ToolRegistry};
pub use transport::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
