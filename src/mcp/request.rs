//! Typed request decoding.
//!
//! Incoming JSON-RPC requests are validated once at this boundary and turned
//! into a per-method variant with a strongly typed payload, so handlers never
//! re-inspect raw parameter bags.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::transport::{ErrorCode, JsonRpcRequest};

/// A request decoded into its per-method payload.
#[derive(Debug, Clone, PartialEq)]
pub enum McpRequest {
    Initialize,
    /// The `initialized` notification (either spelling). No response is sent.
    Initialized,
    ToolsList,
    ToolsCall(ToolCallParams),
    PromptsList,
    PromptsGet(PromptGetParams),
    ResourcesList,
}

/// Validated parameters for `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallParams {
    /// Name of the tool to invoke.
    pub name: String,
    /// Argument object forwarded opaquely to the handler. Defaults to `{}`.
    pub arguments: Value,
}

/// Validated parameters for `prompts/get`.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptGetParams {
    /// Name of the prompt to render.
    pub name: String,
    /// Placeholder values, keyed by argument name.
    pub arguments: HashMap<String, String>,
}

/// A validation failure at the decode boundary, already carrying the wire
/// error code and message for the response.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    pub code: ErrorCode,
    pub message: String,
}

impl DecodeError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidParams,
            message: message.into(),
        }
    }
}

impl McpRequest {
    /// Decodes and validates a raw JSON-RPC request.
    pub fn decode(request: &JsonRpcRequest) -> Result<Self, DecodeError> {
        match request.method.as_str() {
            "initialize" => Ok(Self::Initialize),
            "initialized" | "notifications/initialized" => Ok(Self::Initialized),
            "tools/list" => Ok(Self::ToolsList),
            "tools/call" => decode_tool_call(request.params.as_ref()),
            "prompts/list" => Ok(Self::PromptsList),
            "prompts/get" => decode_prompt_get(request.params.as_ref()),
            "resources/list" => Ok(Self::ResourcesList),
            other => Err(DecodeError {
                code: ErrorCode::MethodNotFound,
                message: format!("Method not found: {}", other),
            }),
        }
    }

    /// True for notifications, which receive no response.
    pub fn is_notification(&self) -> bool {
        matches!(self, Self::Initialized)
    }
}

fn decode_tool_call(params: Option<&Value>) -> Result<McpRequest, DecodeError> {
    let params = params.ok_or_else(|| {
        DecodeError::invalid_params("missing params for tools/call")
    })?;

    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DecodeError::invalid_params("missing 'name' in tools/call params"))?;

    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => json!({}),
        Some(v) if v.is_object() => v.clone(),
        Some(_) => {
            return Err(DecodeError::invalid_params(
                "'arguments' in tools/call params must be an object",
            ));
        }
    };

    Ok(McpRequest::ToolsCall(ToolCallParams {
        name: name.to_string(),
        arguments,
    }))
}

fn decode_prompt_get(params: Option<&Value>) -> Result<McpRequest, DecodeError> {
    let params = params.ok_or_else(|| {
        DecodeError::invalid_params("missing params for prompts/get")
    })?;

    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DecodeError::invalid_params("missing 'name' in prompts/get params"))?;

    let mut arguments = HashMap::new();
    match params.get("arguments") {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (key, value) in map {
                let value = value.as_str().ok_or_else(|| {
                    DecodeError::invalid_params(format!(
                        "prompt argument '{}' must be a string",
                        key
                    ))
                })?;
                arguments.insert(key.clone(), value.to_string());
            }
        }
        Some(_) => {
            return Err(DecodeError::invalid_params(
                "'arguments' in prompts/get params must be an object",
            ));
        }
    }

    Ok(McpRequest::PromptsGet(PromptGetParams {
        name: name.to_string(),
        arguments,
    }))
}
