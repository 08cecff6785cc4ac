//! Wire data model for the OpenAI Chat Completions API.
//!
//! These types serialize/deserialize directly to/from the JSON payloads
//! expected by any OpenAI-compatible endpoint. The conversation log itself
//! lives in [`crate::conversation`]; these are only what goes over the wire.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Message roles
// ---------------------------------------------------------------------------

/// Conversation participant role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction message.
    System,
    /// End-user message.
    User,
    /// Assistant/model message.
    Assistant,
    /// Tool execution result message.
    Tool,
}

impl Role {
    /// Capitalized label used when rendering transcripts for summarization.
    pub fn label(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::Tool => "Tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        };
        f.write_str(value)
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single role-tagged message as sent to (or received from) the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role for this conversation turn.
    pub role: Role,

    /// Text content. Null when the assistant message is purely tool calls.
    pub content: Option<String>,

    /// Tool calls requested by the assistant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,

    /// When role == Tool, the id of the tool_call this result corresponds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Provider-specific message fields that should be preserved verbatim.
    ///
    /// Some OpenAI-compatible APIs attach extra data (reasoning metadata, for
    /// example) and expect it back on follow-up tool-call turns.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ChatMessage {
    fn with_role(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            extra: BTreeMap::new(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, Some(content.into()))
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, Some(content.into()))
    }

    /// Create a plain assistant text message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, Some(content.into()))
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_tool_calls(content: Option<String>, calls: Vec<WireToolCall>) -> Self {
        let mut msg = Self::with_role(Role::Assistant, content);
        msg.tool_calls = Some(calls);
        msg
    }

    /// Create a tool result message, sent back after executing a tool call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, Some(content.into()));
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Requested tool calls, empty when the message carries none.
    pub fn requested_calls(&self) -> &[WireToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Tool calls (in assistant responses)
// ---------------------------------------------------------------------------

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireToolCall {
    /// Unique id used to correlate tool call and tool result.
    pub id: String,
    /// Tool call type; currently expected to be `"function"`.
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    /// Function metadata and arguments for this tool invocation.
    pub function: FunctionCall,
}

impl WireToolCall {
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn is_function(&self) -> bool {
        self.call_type == "function"
    }
}

fn function_type() -> String {
    "function".to_string()
}

/// The function name and JSON-encoded arguments within a tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    /// Function/tool name to execute.
    pub name: String,
    /// JSON-encoded string of the arguments object.
    pub arguments: String,
}

// ---------------------------------------------------------------------------
// Tool definitions (sent in requests)
// ---------------------------------------------------------------------------

/// Tool definition included in the API request so the model knows what's available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool definition type; currently expected to be `"function"`.
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function schema published to the model.
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: function_type(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// The schema of a callable function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Exposed function/tool name.
    pub name: String,
    /// Natural-language description of tool behavior.
    pub description: String,
    /// JSON Schema object describing the parameters.
    pub parameters: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Chat completion request / response
// ---------------------------------------------------------------------------

/// Request body for POST /chat/completions.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier used for request routing.
    pub model: String,
    /// Conversation history sent to the model, in wire order.
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl ChatRequest {
    /// Single-turn request with one user message and no tools.
    pub fn single_user(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
            tools: None,
            temperature: None,
        }
    }
}

/// Response body from POST /chat/completions.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Provider response id.
    #[serde(default)]
    pub id: String,
    /// Ranked response choices.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Optional token usage metadata.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// First choice's message, if the endpoint returned any.
    pub fn into_first_message(self) -> Option<ChatMessage> {
        self.choices.into_iter().next().map(|choice| choice.message)
    }
}

/// A single choice in the API response.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Choice index in the provider response.
    #[serde(default)]
    pub index: u32,
    /// Assistant message payload for this choice.
    pub message: ChatMessage,
    /// Provider stop reason (`stop`, `tool_calls`, etc.).
    pub finish_reason: Option<String>,
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    /// Input tokens consumed by the request.
    pub prompt_tokens: u64,
    /// Output tokens generated by the model.
    pub completion_tokens: u64,
    /// Total tokens (`prompt + completion`).
    pub total_tokens: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
