//! Conversation log data model.
//!
//! A [`Conversation`] owns an append-only, ordered sequence of [`Message`]s.
//! Insertion order is wire order for the endpoint. The only operation that
//! rewrites existing history is [`Conversation::replace_messages`], used by
//! the history compactor to swap a contiguous range for one summary message.

use crate::error::ConversationError;
use crate::types::Role;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Where a message came from. Decides whether it is sent and/or shown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Source {
    /// Text the user actually typed or pasted.
    #[serde(rename = "user-input")]
    UserInput,
    /// Text produced by the model.
    #[serde(rename = "llm-output")]
    AssistantOutput,
    /// Durable system context (preamble, compaction summaries).
    #[serde(rename = "system")]
    System,
    /// Serialized tool results.
    #[serde(rename = "tool-output")]
    ToolOutput,
    /// Ephemeral routing hint; sent only while it is the newest message.
    #[serde(rename = "internal")]
    Internal,
    /// Shown locally (for example a typed slash command), never sent.
    #[serde(rename = "local")]
    Local,
}

impl Source {
    /// True for messages that must not count against the context budget.
    pub fn is_ephemeral(self) -> bool {
        self == Self::Internal
    }

    /// Whether the host should display a message of this source.
    ///
    /// Tool output is debug-gated by the caller.
    pub fn is_user_visible(self, show_tool_output: bool) -> bool {
        match self {
            Self::UserInput | Self::AssistantOutput | Self::System | Self::Local => true,
            Self::ToolOutput => show_tool_output,
            Self::Internal => false,
        }
    }
}

/// Endpoint family the conversation talks to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    OpenRouter,
    #[default]
    LmStudio,
}

impl Provider {
    /// Best-effort provider detection from an OpenAI-compatible base URL.
    pub fn from_base_url(base_url: &str) -> Self {
        let url = base_url.to_ascii_lowercase();
        if url.contains("openrouter.ai") {
            Self::OpenRouter
        } else if url.contains("api.openai.com") {
            Self::OpenAi
        } else {
            Self::LmStudio
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::LmStudio => "lmstudio",
        })
    }
}

// ---------------------------------------------------------------------------
// Tool calls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Pending,
    Completed,
    Error,
}

/// A tool invocation requested by the model and executed by the engine.
///
/// Created `Pending`; moves to `Completed` or `Error` exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    /// Id assigned by the endpoint; tool results are correlated on this.
    pub provider_id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ToolCall {
    pub fn pending(
        provider_id: impl Into<String>,
        name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        let provider_id = provider_id.into();
        Self {
            id: provider_id.clone(),
            provider_id,
            name: name.into(),
            arguments,
            status: ToolCallStatus::Pending,
            result: None,
            error: None,
        }
    }

    /// Record a successful result. Returns false if already resolved.
    pub fn complete(&mut self, result: Value) -> bool {
        if self.status != ToolCallStatus::Pending {
            return false;
        }
        self.status = ToolCallStatus::Completed;
        self.result = Some(result);
        true
    }

    /// Record a failure payload. Returns false if already resolved.
    pub fn fail(&mut self, error: Value) -> bool {
        if self.status != ToolCallStatus::Pending {
            return false;
        }
        self.status = ToolCallStatus::Error;
        self.error = Some(error);
        true
    }

    /// Arguments re-encoded as the JSON string the wire format expects.
    pub fn arguments_json(&self) -> String {
        if self.arguments.is_empty() {
            return "{}".to_string();
        }
        Value::Object(self.arguments.clone()).to_string()
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// One entry of the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// Position at creation time. Not renumbered after compaction.
    pub index: usize,
    pub role: Role,
    pub source: Source,
    pub content: String,
    /// Unix milliseconds.
    pub created_at: u64,
    pub model: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn is_tool_response(&self) -> bool {
        self.role == Role::Tool && self.tool_call_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A chat session: metadata plus its ordered message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: String,
    created_at: u64,
    updated_at: u64,
    provider: Provider,
    default_model: String,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(default_model: impl Into<String>, provider: Provider) -> Self {
        let now = now_millis();
        Self {
            id: short_id("conv"),
            created_at: now,
            updated_at: now,
            provider,
            default_model: default_model.into(),
            messages: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn set_default_model(&mut self, model: impl Into<String>) {
        self.default_model = model.into();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Build (but do not append) a message stamped for this conversation.
    pub fn new_message(
        &self,
        role: Role,
        source: Source,
        content: impl Into<String>,
        model: Option<&str>,
    ) -> Message {
        Message {
            id: short_id(id_prefix(role)),
            conversation_id: self.id.clone(),
            index: self.messages.len(),
            role,
            source,
            content: content.into(),
            created_at: now_millis(),
            model: model.unwrap_or(&self.default_model).to_string(),
            provider: self.provider.to_string(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    /// Append a message, enforcing the tool-message correlation invariant.
    pub fn append(&mut self, message: Message) -> Result<&Message, ConversationError> {
        if message.role == Role::Tool {
            let call_id = message
                .tool_call_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or(ConversationError::MissingToolCallId)?;
            if self.find_tool_call(call_id).is_none() {
                return Err(ConversationError::UnknownToolCallId(call_id.to_string()));
            }
        }
        Ok(self.push_unchecked(message))
    }

    fn push_unchecked(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        self.touch();
        let last = self.messages.len() - 1;
        &self.messages[last]
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &Message {
        let msg = self.new_message(Role::User, Source::UserInput, text, None);
        self.push_unchecked(msg)
    }

    /// Locally displayed user text (never sent to the endpoint).
    pub fn push_local(&mut self, text: impl Into<String>) -> &Message {
        let msg = self.new_message(Role::User, Source::Local, text, None);
        self.push_unchecked(msg)
    }

    /// Ephemeral routing hint, sent only while it is the newest message.
    pub fn push_internal(&mut self, role: Role, text: impl Into<String>) -> &Message {
        let msg = self.new_message(role, Source::Internal, text, None);
        self.push_unchecked(msg)
    }

    /// Durable system context.
    pub fn push_system(&mut self, text: impl Into<String>) -> &Message {
        let msg = self.new_message(Role::System, Source::System, text, None);
        self.push_unchecked(msg)
    }

    pub fn push_assistant(&mut self, text: impl Into<String>, model: Option<&str>) -> &Message {
        let msg = self.new_message(Role::Assistant, Source::AssistantOutput, text, model);
        self.push_unchecked(msg)
    }

    /// Assistant message that requests tool calls (content may be empty).
    pub fn push_assistant_tool_calls(
        &mut self,
        content: impl Into<String>,
        calls: Vec<ToolCall>,
        model: Option<&str>,
    ) -> &Message {
        let mut msg = self.new_message(Role::Assistant, Source::AssistantOutput, content, model);
        msg.tool_calls = calls;
        self.push_unchecked(msg)
    }

    /// Tool-role result correlated to a previously requested call.
    pub fn push_tool_result(
        &mut self,
        call_id: &str,
        content: impl Into<String>,
        model: Option<&str>,
    ) -> Result<&Message, ConversationError> {
        let mut msg = self.new_message(Role::Tool, Source::ToolOutput, content, model);
        msg.tool_call_id = Some(call_id.to_string());
        self.append(msg)
    }

    /// Mark a pending call as completed. Returns false if unknown or resolved.
    pub fn complete_tool_call(&mut self, call_id: &str, result: Value) -> bool {
        self.find_tool_call_mut(call_id)
            .is_some_and(|call| call.complete(result))
    }

    /// Mark a pending call as failed. Returns false if unknown or resolved.
    pub fn fail_tool_call(&mut self, call_id: &str, error: Value) -> bool {
        self.find_tool_call_mut(call_id)
            .is_some_and(|call| call.fail(error))
    }

    pub fn find_tool_call(&self, call_id: &str) -> Option<&ToolCall> {
        self.messages
            .iter()
            .rev()
            .flat_map(|m| m.tool_calls.iter())
            .find(|call| call.provider_id == call_id)
    }

    fn find_tool_call_mut(&mut self, call_id: &str) -> Option<&mut ToolCall> {
        self.messages
            .iter_mut()
            .rev()
            .flat_map(|m| m.tool_calls.iter_mut())
            .find(|call| call.provider_id == call_id)
    }

    /// Replace the whole log (compaction result). Advances `updated_at`.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.touch();
    }

    /// Drop everything except the leading durable system preamble.
    pub fn clear(&mut self) {
        let keep = self
            .messages
            .iter()
            .take_while(|m| m.role == Role::System && m.source == Source::System)
            .count();
        self.messages.truncate(keep);
        self.touch();
    }

    /// Messages the host should display.
    pub fn visible_messages(&self, show_tool_output: bool) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(move |m| m.source.is_user_visible(show_tool_output))
    }

    /// Content of the newest assistant output, if any.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && m.source == Source::AssistantOutput && m.has_content())
            .map(|m| m.content.as_str())
    }

    fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at.saturating_add(1));
    }
}

fn id_prefix(role: Role) -> &'static str {
    match role {
        Role::System => "sys",
        Role::User => "user",
        Role::Assistant => "asst",
        Role::Tool => "tool",
    }
}

/// Short random identifier such as `asst_1a2b3c4d`.
pub(crate) fn short_id(prefix: &str) -> String {
    format!("{prefix}_{:08x}", rand::random::<u32>())
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
