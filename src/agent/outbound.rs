//! Conversation to wire-message rendering.
//!
//! Applies the provenance rules: what the model sees is decided by each
//! message's [`Source`], not just its role.

use crate::conversation::{Conversation, Message, Source};
use crate::types::{ChatMessage, Role, WireToolCall};

/// Id of the newest message if it is ephemeral.
///
/// Captured once at the start of a turn; that message stays in the outbound
/// buffer even after the loop appends messages behind it.
pub(super) fn pinned_ephemeral(conversation: &Conversation) -> Option<String> {
    conversation
        .messages()
        .last()
        .filter(|message| message.source.is_ephemeral())
        .map(|message| message.id.clone())
}

/// Render the messages the endpoint should see, in log order.
pub(super) fn render(conversation: &Conversation, pinned: Option<&str>) -> Vec<ChatMessage> {
    conversation
        .messages()
        .iter()
        .filter_map(|message| render_message(message, pinned))
        .collect()
}

fn render_message(message: &Message, pinned: Option<&str>) -> Option<ChatMessage> {
    if !message.has_content() && !message.has_tool_calls() && !message.is_tool_response() {
        return None;
    }
    if message.source.is_ephemeral() && pinned != Some(message.id.as_str()) {
        return None;
    }

    match message.role {
        Role::System => message
            .has_content()
            .then(|| ChatMessage::system(message.content.clone())),
        Role::User => {
            let sendable = matches!(message.source, Source::UserInput | Source::Internal);
            (sendable && message.has_content()).then(|| ChatMessage::user(message.content.clone()))
        }
        Role::Assistant => {
            if message.source != Source::AssistantOutput {
                return None;
            }
            if message.has_tool_calls() {
                let calls = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        WireToolCall::function(&call.provider_id, &call.name, call.arguments_json())
                    })
                    .collect();
                let content = message.has_content().then(|| message.content.clone());
                Some(ChatMessage::assistant_tool_calls(content, calls))
            } else {
                Some(ChatMessage::assistant(message.content.clone()))
            }
        }
        Role::Tool => {
            let call_id = message.tool_call_id.as_deref().filter(|id| !id.is_empty())?;
            message
                .has_content()
                .then(|| ChatMessage::tool_result(call_id, message.content.clone()))
        }
    }
}
