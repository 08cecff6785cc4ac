//! Core tool-resolution loop.
//!
//! The [`Agent`] answers the newest turn of a [`Conversation`]: it renders the
//! log for the endpoint, executes any tool calls the model requests, feeds the
//! results back, and repeats until the model replies with plain text or the
//! iteration cap is reached.

use crate::api::{ApiClient, ModelClient};
use crate::budget::ContextBudget;
use crate::config::{AgentConfig, Config};
use crate::conversation::{short_id, Conversation, Provider, ToolCall};
use crate::error::{ApiError, ToolError};
use crate::summary::{ModelSummarizer, SummaryService, TrimResult};
use crate::tools::{parse_arguments, ToolRegistry};
use crate::types::{ChatMessage, ChatRequest, WireToolCall};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod outbound;

/// Returned when the loop exhausts its round trips without a final answer.
pub const MAX_ITERATIONS_ERROR: &str =
    "ERROR: tool loop did not resolve to a final assistant message.";

/// Drives one conversation turn through the model and registered tools.
pub struct Agent {
    /// Model client implementation (HTTP client in prod, mocks in tests).
    client: Box<dyn ModelClient>,
    /// Registered tool implementations available to the model.
    tools: ToolRegistry,
    config: AgentConfig,
    /// Compactor run before each model call; `None` disables compaction.
    summary: Option<SummaryService>,
    /// Fixed context window overriding the model catalog.
    context_limit: Option<usize>,
}

impl Agent {
    /// Create an agent from configuration with tools pre-registered.
    ///
    /// The same HTTP client backs both the tool loop and the summarizer.
    pub fn new(config: &Config, tools: ToolRegistry) -> Self {
        let client = Arc::new(ApiClient::new(&config.api));
        let summarizer = ModelSummarizer::new(Arc::clone(&client), config.api.model.clone());
        let summary = SummaryService::new(Box::new(summarizer), config.summary.clone())
            .with_context_limit(config.api.context_limit);
        Self::with_client(Box::new(client), tools, config.agent.clone())
            .with_summary(summary)
            .with_context_limit(config.api.context_limit)
    }

    /// Create an agent with an explicit model client implementation.
    ///
    /// Used for deterministic testing and alternative backends.
    pub fn with_client(
        client: Box<dyn ModelClient>,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Self {
        Self {
            client,
            tools,
            config,
            summary: None,
            context_limit: None,
        }
    }

    pub fn with_summary(mut self, summary: SummaryService) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn with_context_limit(mut self, context_limit: Option<usize>) -> Self {
        self.context_limit = context_limit.filter(|limit| *limit > 0);
        self
    }

    pub fn summary(&self) -> Option<&SummaryService> {
        self.summary.as_ref()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// New conversation seeded with the configured system prompt.
    pub fn start_conversation(&self, model: &str, provider: Provider) -> Conversation {
        let mut conversation = Conversation::new(model, provider);
        if !self.config.system_prompt.is_empty() {
            conversation.push_system(self.config.system_prompt.clone());
        }
        conversation
    }

    /// Produce the model's answer to the conversation's newest turn.
    ///
    /// Tool-call messages and tool results are appended to `conversation`; the
    /// final answer is returned, not appended. Tool failures are fed back to
    /// the model as `{"error": ...}` payloads. Only a transport failure of a
    /// model call is returned as `Err`. When the iteration cap is reached the
    /// result is [`MAX_ITERATIONS_ERROR`].
    pub async fn respond(
        &self,
        conversation: &mut Conversation,
        model_override: Option<&str>,
    ) -> Result<String, ApiError> {
        let model = model_override
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(conversation.default_model())
            .to_string();
        let pinned = outbound::pinned_ephemeral(conversation);
        let tool_defs = (!self.tools.is_empty()).then(|| self.tools.definitions());
        let max_iterations = self.config.max_iterations.max(1);

        let mut messages = outbound::render(conversation, pinned.as_deref());
        for iteration in 1..=max_iterations {
            if self.compact_before_call(conversation, &model).await {
                messages = outbound::render(conversation, pinned.as_deref());
            }

            let request = ChatRequest {
                model: model.clone(),
                messages: messages.clone(),
                tools: tool_defs.clone(),
                temperature: self.config.temperature,
            };
            debug!(
                iteration,
                model = %model,
                messages = request.messages.len(),
                "calling model"
            );
            let response = self.client.chat(&request).await?;

            let Some(reply) = response.into_first_message() else {
                debug!(iteration, "model returned no message");
                return Ok(String::new());
            };
            let calls = normalize_calls(reply.tool_calls.clone().unwrap_or_default());
            if calls.is_empty() {
                debug!(iteration, "model returned final answer");
                return Ok(reply.content.unwrap_or_default());
            }

            self.run_tool_calls(conversation, &mut messages, &model, reply.content, calls)
                .await;
        }

        warn!(max_iterations, model = %model, "tool loop hit iteration ceiling");
        Ok(MAX_ITERATIONS_ERROR.to_string())
    }

    /// Record the assistant's tool request, execute each call, and append the
    /// results to both the conversation and the outbound buffer.
    async fn run_tool_calls(
        &self,
        conversation: &mut Conversation,
        messages: &mut Vec<ChatMessage>,
        model: &str,
        content: Option<String>,
        calls: Vec<WireToolCall>,
    ) {
        let parsed: Vec<Result<Map<String, Value>, ToolError>> = calls
            .iter()
            .map(|call| parse_arguments(&call.function.arguments))
            .collect();
        let pending = calls
            .iter()
            .zip(&parsed)
            .map(|(call, args)| {
                ToolCall::pending(
                    call.id.clone(),
                    call.function.name.clone(),
                    args.clone().unwrap_or_default(),
                )
            })
            .collect();
        let content = content.filter(|text| !text.trim().is_empty());
        conversation.push_assistant_tool_calls(
            content.clone().unwrap_or_default(),
            pending,
            Some(model),
        );
        messages.push(ChatMessage::assistant_tool_calls(content, calls.clone()));

        for (call, args) in calls.iter().zip(parsed) {
            let name = call.function.name.as_str();
            let outcome = match args {
                Ok(args) => self.tools.execute(name, &args).await,
                Err(err) => Err(err),
            };
            let payload = match outcome {
                Ok(value) => {
                    info!(tool = name, call_id = %call.id, "tool call completed");
                    conversation.complete_tool_call(&call.id, value.clone());
                    value
                }
                Err(err) => {
                    warn!(tool = name, call_id = %call.id, error = %err, "tool call failed");
                    let payload = err.to_payload();
                    conversation.fail_tool_call(&call.id, payload.clone());
                    payload
                }
            };
            let body = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
            if let Err(err) = conversation.push_tool_result(&call.id, body.clone(), Some(model)) {
                warn!(call_id = %call.id, error = %err, "could not record tool result");
            }
            messages.push(ChatMessage::tool_result(call.id.clone(), body));
        }
    }

    /// Compact in place when the next call would not fit. Returns true if the
    /// conversation changed.
    async fn compact_before_call(&self, conversation: &mut Conversation, model: &str) -> bool {
        let Some(summary) = &self.summary else {
            return false;
        };
        let reserve = summary.config().reserve_tokens;
        summary.compact(conversation, model, reserve).await.was_trimmed
    }

    /// Compacted message list if less than `reserve_tokens` remain.
    pub async fn trim_if_needed(
        &self,
        conversation: &Conversation,
        model: &str,
        reserve_tokens: usize,
    ) -> TrimResult {
        match &self.summary {
            Some(summary) => summary.trim_if_needed(conversation, model, reserve_tokens).await,
            None => TrimResult::unchanged(conversation),
        }
    }

    /// Like [`Self::trim_if_needed`] but applies the result.
    pub async fn compact(
        &self,
        conversation: &mut Conversation,
        model: &str,
        reserve_tokens: usize,
    ) -> TrimResult {
        match &self.summary {
            Some(summary) => summary.compact(conversation, model, reserve_tokens).await,
            None => TrimResult::unchanged(conversation),
        }
    }

    pub fn budget(&self, model: &str) -> ContextBudget {
        ContextBudget::new(model, self.context_limit)
    }

    pub fn remaining_tokens(&self, conversation: &Conversation, model: &str) -> usize {
        self.budget(model).remaining_tokens(conversation)
    }

    pub fn usage_percent(&self, conversation: &Conversation, model: &str) -> u8 {
        self.budget(model).usage_percent(conversation)
    }

    pub fn is_near_limit(&self, conversation: &Conversation, model: &str, threshold: f64) -> bool {
        self.budget(model).is_near_limit(conversation, threshold)
    }
}

/// Give id-less or repeated calls a local id so every result correlates to
/// exactly one call.
fn normalize_calls(mut calls: Vec<WireToolCall>) -> Vec<WireToolCall> {
    let mut seen = HashSet::new();
    for call in &mut calls {
        if call.id.trim().is_empty() || !seen.insert(call.id.clone()) {
            call.id = short_id("call");
            seen.insert(call.id.clone());
        }
    }
    calls
}
