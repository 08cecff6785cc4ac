//! Pluggable tool system.
//!
//! Tools are async trait objects that the model can invoke during the tool
//! loop. Each tool provides its own OpenAI function definition and an async
//! execute method returning a typed result; failures are values, never panics.

pub mod time;

use crate::error::ToolError;
use crate::types::ToolDefinition;
use async_trait::async_trait;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Tool trait
// ---------------------------------------------------------------------------

/// A tool that can be invoked by the AI model.
///
/// Implement this trait to add custom tools. Register instances with
/// [`ToolRegistry`] before creating the agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name matching what the model will call.
    fn name(&self) -> &'static str;

    /// OpenAI-format tool definition for inclusion in API requests.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the parsed JSON argument object.
    /// The returned value is serialized and sent back to the model.
    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError>;
}

// ---------------------------------------------------------------------------
// Tool registry
// ---------------------------------------------------------------------------

/// Registry of available tools.
///
/// The agent sends all registered tool definitions to the API, and dispatches
/// tool calls through this registry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name();
        self.tools.retain(|existing| existing.name() != name);
        self.tools.push(Box::new(tool));
    }

    /// Get tool definitions for the API request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Find a tool by name and execute it.
    pub async fn execute(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(arguments).await
    }

    /// True if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Parse a wire-format argument string into a JSON object.
///
/// Blank input is treated as `{}`; anything other than an object is rejected.
pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ToolError::InvalidArguments(format!(
            "arguments must be a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
