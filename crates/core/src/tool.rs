//! Tool trait — the closed set of actions the model may request.
//!
//! Tools are registered once at startup. Dispatch never panics and never
//! propagates an error upward: unknown names and execution failures fold
//! into an `is_error` output so the model can see the failure and react.

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A model-issued request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_use block id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Flat argument map as a JSON value
    pub arguments: serde_json::Value,
}

/// The outcome of a tool execution: a flat key/value payload plus the
/// mandatory error flag. File-producing tools include a `file_path` key
/// by convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub payload: serde_json::Map<String, serde_json::Value>,
    pub is_error: bool,
}

impl ToolOutput {
    /// Start a successful output; chain entries with [`with`].
    ///
    /// [`with`]: ToolOutput::with
    pub fn ok() -> Self {
        Self {
            payload: serde_json::Map::new(),
            is_error: false,
        }
    }

    /// A failed output carrying a descriptive message under `error`.
    pub fn error(message: impl Into<String>) -> Self {
        let mut payload = serde_json::Map::new();
        payload.insert("error".into(), serde_json::Value::String(message.into()));
        Self {
            payload,
            is_error: true,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// String payload entry, if present.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(serde_json::Value::as_str)
    }

    /// The error message, if this is an error output.
    pub fn error_message(&self) -> Option<&str> {
        self.get_str("error")
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's arguments.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given flat argument map.
    ///
    /// Expected failures (missing file, bad path) belong in an
    /// `is_error` output, not in `Err` — the model should see them.
    /// `Err` is reserved for malformed arguments.
    async fn execute(&self, arguments: serde_json::Value)
    -> std::result::Result<ToolOutput, ToolError>;

    /// Convert this tool into a definition for the model-call request.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// The static registry of available tools, built once at startup.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool definitions for the model-call request, name-ordered.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// All registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Execute a call, folding every failure mode into an output the
    /// model can read.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutput {
        let Some(tool) = self.tools.get(&call.name) else {
            tracing::warn!(tool = %call.name, "model requested an unknown tool");
            return ToolOutput::error(format!("Unknown tool: {}", call.name));
        };

        match tool.execute(call.arguments.clone()).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool execution failed");
                ToolOutput::error(e.to_string())
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
