//! Tool records and the tool registry.
//!
//! A tool is a named capability the host can invoke. The server core never
//! inspects a tool's arguments or results; handlers own their validation and
//! the underlying work (image resizing, format conversion, generation, and
//! so on in the shipped toolkits).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{PixelsmithError, Result};

use super::cancel::CancellationToken;

/// The function behind a tool: argument bag in, result bag out.
///
/// The token is the transport loop's shutdown token; a handler that runs long
/// should check it and abort early when it fires.
pub type ToolHandler = Arc<dyn Fn(Value, CancellationToken) -> Result<Value> + Send + Sync>;

/// A registered tool: its discovery metadata plus its handler.
#[derive(Clone)]
pub struct Tool {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    pub input_schema: Value,
    /// Opaque hint metadata passed through to `tools/list` verbatim.
    pub annotations: Option<Value>,
    /// The handler invoked by `tools/call`.
    pub handler: ToolHandler,
}

impl Tool {
    /// Creates a tool without annotations.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            annotations: None,
            handler,
        }
    }

    /// Attaches an annotation block to this tool.
    pub fn with_annotations(mut self, annotations: Value) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Returns the discovery view of this tool, as listed by `tools/list`.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A tool definition exposed through `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

/// Named lookup table of tools.
///
/// Populated once before the transport loop starts; read-only afterwards.
/// Registration order is preserved in listings.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. Fails if a tool with the same name already exists.
    pub fn register(&mut self, tool: Tool) -> Result<()> {
        if self.get(&tool.name).is_some() {
            return Err(PixelsmithError::Registry {
                message: format!("tool already registered: {}", tool.name),
            });
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Looks up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Returns the discovery view of every registered tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(Tool::definition).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
