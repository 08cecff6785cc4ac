//! Summarization with a deterministic truncation fallback.
//!
//! One primitive, [`SummaryService::summarize_with_fallback`], backs both
//! conversation compaction ([`compact`]) and oversized paste handling
//! ([`paste`]). The model call is an injected [`Summarizer`] so the engine
//! never recurses into itself and tests can stub it.

mod compact;
mod paste;

pub use compact::TrimResult;
pub use paste::{PasteBuffer, PasteSummary};

use crate::api::ModelClient;
use crate::config::SummaryConfig;
use crate::error::ApiError;
use crate::textutil::cut_with_marker;
use crate::tokens::{tokens_to_words, CHARS_PER_TOKEN};
use crate::types::ChatRequest;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Appended to text cut down by the fallback path.
pub const TRUNCATION_MARKER: &str = "\n[... truncated]";

/// "Compress this text to about N tokens" capability.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str) -> Result<String, ApiError>;
}

/// Summarizer backed by the same chat-completion endpoint as the agent.
pub struct ModelSummarizer<C> {
    client: C,
    model: String,
}

impl<C: ModelClient> ModelSummarizer<C> {
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl<C: ModelClient> Summarizer for ModelSummarizer<C> {
    async fn summarize(&self, prompt: &str) -> Result<String, ApiError> {
        let request = ChatRequest::single_user(self.model.clone(), prompt);
        let response = self.client.chat(&request).await?;
        response
            .into_first_message()
            .and_then(|message| message.content)
            .ok_or_else(|| ApiError::InvalidResponse("summary response had no content".into()))
    }
}

/// Output of one summarize attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    pub text: String,
    /// True when the summarizer failed and the text was cut instead.
    pub was_truncated: bool,
}

/// What the text being summarized is, as worded in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryContext {
    ConversationHistory,
    PastedContent,
}

impl SummaryContext {
    fn describe(self) -> &'static str {
        match self {
            Self::ConversationHistory => "conversation history",
            Self::PastedContent => "pasted content",
        }
    }
}

/// Compaction and paste summarization driven by a [`Summarizer`].
pub struct SummaryService {
    summarizer: Box<dyn Summarizer>,
    config: SummaryConfig,
    context_limit: Option<usize>,
}

impl SummaryService {
    pub fn new(summarizer: Box<dyn Summarizer>, config: SummaryConfig) -> Self {
        Self {
            summarizer,
            config,
            context_limit: None,
        }
    }

    /// Use a fixed context window instead of the model catalog.
    pub fn with_context_limit(mut self, context_limit: Option<usize>) -> Self {
        self.context_limit = context_limit.filter(|limit| *limit > 0);
        self
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    pub fn context_limit(&self) -> Option<usize> {
        self.context_limit
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Summarize `text` to roughly `target_tokens`; the fallback is invisible
    /// to the caller.
    pub async fn summarize(
        &self,
        text: &str,
        target_tokens: usize,
        context: SummaryContext,
    ) -> String {
        self.summarize_with_fallback(text, target_tokens, context)
            .await
            .text
    }

    /// Summarize `text`, reporting whether the truncation fallback was used.
    pub async fn summarize_with_fallback(
        &self,
        text: &str,
        target_tokens: usize,
        context: SummaryContext,
    ) -> SummaryOutcome {
        let target_words = self.target_words(target_tokens);
        let prompt = summary_prompt(context, target_words, text);
        match self.summarizer.summarize(&prompt).await {
            Ok(summary) if !summary.trim().is_empty() => {
                debug!(
                    context = context.describe(),
                    target_tokens, target_words, "summarized text"
                );
                SummaryOutcome {
                    text: summary.trim().to_string(),
                    was_truncated: false,
                }
            }
            Ok(_) => {
                warn!(context = context.describe(), "summarizer returned no text; truncating");
                truncated(text, target_tokens)
            }
            Err(err) => {
                warn!(context = context.describe(), error = %err, "summarizer failed; truncating");
                truncated(text, target_tokens)
            }
        }
    }

    fn target_words(&self, target_tokens: usize) -> usize {
        tokens_to_words((target_tokens as f64 * self.config.word_ratio) as usize)
    }
}

fn truncated(text: &str, target_tokens: usize) -> SummaryOutcome {
    SummaryOutcome {
        text: truncate_to_tokens(text, target_tokens),
        was_truncated: true,
    }
}

/// Cut `text` to `target_tokens * CHARS_PER_TOKEN` characters plus the marker.
pub fn truncate_to_tokens(text: &str, target_tokens: usize) -> String {
    cut_with_marker(
        text,
        target_tokens.saturating_mul(CHARS_PER_TOKEN),
        TRUNCATION_MARKER,
    )
}

fn summary_prompt(context: SummaryContext, target_words: usize, text: &str) -> String {
    format!(
        "Summarize the following {} concisely in approximately {target_words} words.\n\
         Preserve key information, code snippets, file paths, and important technical details.\n\
         Do not add commentary or preamble - provide only the summary.\n\
         \n\
         ---\n\
         {text}",
        context.describe()
    )
}
