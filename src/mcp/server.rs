//! MCP server that reads JSON-RPC 2.0 messages from stdin and writes
//! responses to stdout.
//!
//! The server exposes registered tools and prompts via the Model Context
//! Protocol. Registration happens through [`McpServerBuilder`] before the
//! transport loop starts; the registries are read-only afterwards. All
//! diagnostics go to stderr via `tracing` so the protocol stream stays clean.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::errors::{PixelsmithError, Result};
use crate::metrics::MetricsCollector;

use super::cancel::CancellationToken;
use super::prompts::{Prompt, PromptRegistry};
use super::request::{McpRequest, PromptGetParams, ToolCallParams};
use super::tools::{Tool, ToolDefinition, ToolRegistry};
use super::transport::{ErrorCode, JsonRpcRequest, JsonRpcResponse};

/// MCP protocol revision implemented by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name of the built-in diagnostics tool.
pub const STATS_TOOL_NAME: &str = "server_stats";

/// Default truncation limit for tool response text.
const DEFAULT_MAX_RESPONSE_CHARS: usize = 15_000;

/// Request-level counters, separate from the per-tool metrics.
struct ServerStats {
    started_at: Instant,
    total_requests: AtomicU64,
    errors: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

/// Builder for [`McpServer`].
///
/// Collects tool and prompt registrations, then freezes them into the server.
pub struct McpServerBuilder {
    name: String,
    version: String,
    max_response_chars: usize,
    tools: ToolRegistry,
    prompts: PromptRegistry,
}

impl McpServerBuilder {
    /// Starts a builder for a server advertising the given name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            max_response_chars: DEFAULT_MAX_RESPONSE_CHARS,
            tools: ToolRegistry::new(),
            prompts: PromptRegistry::new(),
        }
    }

    /// Overrides the tool response truncation limit.
    pub fn max_response_chars(mut self, limit: usize) -> Self {
        self.max_response_chars = limit;
        self
    }

    /// Registers a tool. Fails on a duplicate name or on the name reserved
    /// for the built-in diagnostics tool.
    pub fn tool(mut self, tool: Tool) -> Result<Self> {
        if tool.name == STATS_TOOL_NAME {
            return Err(PixelsmithError::Registry {
                message: format!("tool name is reserved: {}", STATS_TOOL_NAME),
            });
        }
        self.tools.register(tool)?;
        Ok(self)
    }

    /// Registers a prompt. Fails on a duplicate name.
    pub fn prompt(mut self, prompt: Prompt) -> Result<Self> {
        self.prompts.register(prompt)?;
        Ok(self)
    }

    /// Freezes the registries and constructs the server.
    pub fn build(self) -> McpServer {
        McpServer {
            name: self.name,
            version: self.version,
            max_response_chars: self.max_response_chars,
            tools: self.tools,
            prompts: self.prompts,
            metrics: MetricsCollector::new(),
            stats: ServerStats::new(),
            initialized: AtomicBool::new(false),
        }
    }
}

/// The MCP server: registries, metrics, and the stdio transport loop.
///
/// The connection is a two-state machine: until the host sends `initialize`,
/// every other request method is rejected.
pub struct McpServer {
    name: String,
    version: String,
    max_response_chars: usize,
    tools: ToolRegistry,
    prompts: PromptRegistry,
    metrics: MetricsCollector,
    stats: ServerStats,
    initialized: AtomicBool,
}

impl McpServer {
    /// Starts a builder for a server advertising the given name and version.
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> McpServerBuilder {
        McpServerBuilder::new(name, version)
    }

    /// The metrics collector owned by this server.
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Runs the transport loop until stdin closes or `shutdown` fires.
    ///
    /// One framed message is read at a time; a request being processed is
    /// never interrupted, but `shutdown` stops the loop before the next read
    /// and is forwarded to tool handlers so they can abort themselves. An
    /// unreadable input stream is fatal and returned as an error.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        tracing::info!(name = %self.name, version = %self.version, "mcp server listening on stdio");

        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("shutdown signal received, stopping transport loop");
                    break;
                }
                line = lines.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!("stdin closed, stopping transport loop");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "input stream unreadable, terminating");
                    return Err(e.into());
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = self.handle_line(line, &shutdown);

            if let Some(resp) = response {
                let json_line = match serde_json::to_string(&resp) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize response");
                        continue;
                    }
                };
                let output = format!("{}\n", json_line);
                stdout.write_all(output.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }

    /// Decodes one input line and dispatches it.
    ///
    /// A line that is not JSON at all, or whose `id` cannot be recovered, is
    /// dropped: there is no address to send an error to. A line that is JSON
    /// but not a valid request gets a ParseError response echoing its id.
    fn handle_line(&self, line: &str, shutdown: &CancellationToken) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable input line");
                return None;
            }
        };

        let recovered_id = value.get("id").cloned().unwrap_or(Value::Null);

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(&request, shutdown),
            Err(e) if recovered_id.is_null() => {
                tracing::warn!(error = %e, "dropping malformed request without id");
                None
            }
            Err(e) => Some(JsonRpcResponse::error(
                recovered_id,
                ErrorCode::ParseError,
                format!("failed to parse JSON-RPC request: {}", e),
            )),
        }
    }

    /// Dispatches a parsed JSON-RPC request.
    ///
    /// Every outcome, success or failure, is encoded into a response; this
    /// function never fails. Returns `None` for notifications.
    pub fn handle_request(
        &self,
        request: &JsonRpcRequest,
        shutdown: &CancellationToken,
    ) -> Option<JsonRpcResponse> {
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
        let id = request.id.clone();

        let decoded = match McpRequest::decode(request) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                return Some(JsonRpcResponse::error(id, e.code, e.message));
            }
        };

        if decoded.is_notification() {
            return None;
        }

        if !self.initialized.load(Ordering::SeqCst) && decoded != McpRequest::Initialize {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
            return Some(JsonRpcResponse::error(
                id,
                ErrorCode::InvalidRequest,
                format!("server not initialized: send initialize before {}", request.method),
            ));
        }

        let response = match decoded {
            McpRequest::Initialize => self.handle_initialize(id),
            McpRequest::Initialized => return None,
            McpRequest::ToolsList => self.handle_tools_list(id),
            McpRequest::ToolsCall(call) => self.handle_tools_call(id, call, shutdown),
            McpRequest::PromptsList => self.handle_prompts_list(id),
            McpRequest::PromptsGet(get) => self.handle_prompts_get(id, get),
            McpRequest::ResourcesList => {
                // Capability surface exists; nothing is registered behind it.
                JsonRpcResponse::success(id, json!({ "resources": [] }))
            }
        };

        if response.error.is_some() {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
        }

        Some(response)
    }

    /// Handles `initialize`: declares capabilities and readies the connection.
    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        self.initialized.store(true, Ordering::SeqCst);
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": self.name,
                    "version": self.version,
                },
                "capabilities": {
                    "tools": { "listChanged": true },
                    "prompts": { "listChanged": false },
                }
            }),
        )
    }

    /// Handles `tools/list`: every registered tool plus the built-in
    /// diagnostics tool.
    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let mut tools = self.tools.definitions();
        tools.push(stats_tool_definition());
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    /// Handles `tools/call`: times the handler and records the outcome.
    fn handle_tools_call(
        &self,
        id: Value,
        call: ToolCallParams,
        shutdown: &CancellationToken,
    ) -> JsonRpcResponse {
        let handler = if call.name == STATS_TOOL_NAME {
            None
        } else {
            match self.tools.get(&call.name) {
                Some(tool) => Some(tool.handler.clone()),
                None => {
                    return JsonRpcResponse::error(
                        id,
                        ErrorCode::ToolNotFound,
                        format!("Tool not found: {}", call.name),
                    );
                }
            }
        };

        let start = Instant::now();
        let result = match handler {
            Some(handler) => handler(call.arguments, shutdown.clone()),
            None => Ok(self.server_stats_json()),
        };
        self.metrics.record(&call.name, start.elapsed(), result.is_ok());

        match result {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value).unwrap_or_default();
                JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": self.truncate_response(&text) }]
                    }),
                )
            }
            Err(e) => JsonRpcResponse::error(
                id,
                ErrorCode::InternalError,
                format!("Tool execution failed: {}", e),
            ),
        }
    }

    /// Handles `prompts/list`.
    fn handle_prompts_list(&self, id: Value) -> JsonRpcResponse {
        let prompts: Vec<Value> = self
            .prompts
            .all()
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "title": p.title,
                    "description": p.description,
                    "arguments": p.arguments,
                })
            })
            .collect();
        JsonRpcResponse::success(id, json!({ "prompts": prompts }))
    }

    /// Handles `prompts/get`: renders the template with the supplied values.
    fn handle_prompts_get(&self, id: Value, get: PromptGetParams) -> JsonRpcResponse {
        let prompt = match self.prompts.get(&get.name) {
            Some(prompt) => prompt,
            None => {
                return JsonRpcResponse::error(
                    id,
                    ErrorCode::PromptNotFound,
                    format!("Prompt not found: {}", get.name),
                );
            }
        };

        match prompt.render(&get.arguments) {
            Ok(text) => JsonRpcResponse::success(
                id,
                json!({
                    "description": prompt.description,
                    "messages": [{
                        "role": "user",
                        "content": { "type": "text", "text": text }
                    }]
                }),
            ),
            Err(e @ PixelsmithError::MissingArgument { .. }) => {
                JsonRpcResponse::error(id, ErrorCode::InvalidParams, e.to_string())
            }
            Err(e) => JsonRpcResponse::error(id, ErrorCode::InternalError, e.to_string()),
        }
    }

    /// Current request counters, metrics summary, and per-tool stats.
    pub fn server_stats_json(&self) -> Value {
        let uptime = self.stats.started_at.elapsed();
        let per_tool: Vec<Value> = self
            .metrics
            .all_stats()
            .values()
            .map(|s| s.to_json())
            .collect();

        json!({
            "uptime_secs": uptime.as_secs(),
            "total_requests": self.stats.total_requests.load(Ordering::Relaxed),
            "request_errors": self.stats.errors.load(Ordering::Relaxed),
            "summary": self.metrics.summary(),
            "tools": per_tool,
        })
    }

    /// Truncates tool response text at the configured limit, appending a
    /// truncation notice.
    fn truncate_response(&self, s: &str) -> String {
        if s.len() <= self.max_response_chars {
            return s.to_string();
        }
        // Back up to a valid UTF-8 character boundary.
        let mut end = self.max_response_chars;
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}\n\n[... truncated at {} chars]", &s[..end], end)
    }
}

/// Discovery view of the built-in diagnostics tool.
fn stats_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: STATS_TOOL_NAME.to_string(),
        description: "Return server uptime, request counters, and per-tool invocation metrics."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
        annotations: None,
    }
}
