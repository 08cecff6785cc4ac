//! Context window sizing and remaining-budget accounting.
//!
//! Window sizes come from the embedded `templates/models.toml` catalog using
//! case-insensitive, longest-substring-match-first lookup. Unknown models get
//! a conservative default.

use crate::conversation::Conversation;
use crate::tokens;
use serde::Deserialize;
use std::sync::OnceLock;

/// Window size used when no catalog entry matches.
pub const DEFAULT_CONTEXT_SIZE: usize = 8_192;

/// Fallback table used only if the embedded catalog fails to parse.
const BUILTIN_MODELS: &[(&str, usize)] = &[
    ("gpt-4o", 128_000),
    ("gpt-4o-mini", 128_000),
    ("gpt-4-turbo", 128_000),
    ("gpt-4", 8_192),
    ("gpt-3.5-turbo", 16_385),
    ("gpt-3.5", 16_385),
    ("claude-3", 200_000),
    ("mistral", 32_768),
];

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A single window-size entry from `models.toml`.
#[derive(Debug, Clone, Deserialize)]
struct ModelEntry {
    /// Substring compared against the lowercased model id.
    pattern: String,
    context_window: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelCatalog {
    #[serde(default = "default_context_window")]
    default_context_window: usize,
    #[serde(default)]
    model: Vec<ModelEntry>,
}

impl ModelCatalog {
    fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let mut catalog: Self = toml::from_str(text)?;
        catalog.normalize();
        Ok(catalog)
    }

    fn from_builtin() -> Self {
        let mut catalog = Self {
            default_context_window: DEFAULT_CONTEXT_SIZE,
            model: BUILTIN_MODELS
                .iter()
                .map(|(pattern, context_window)| ModelEntry {
                    pattern: (*pattern).to_string(),
                    context_window: *context_window,
                })
                .collect(),
        };
        catalog.normalize();
        catalog
    }

    /// Lowercase patterns, drop empty ones and sort longest-first.
    ///
    /// The sort is stable, so equal-length patterns keep file order.
    fn normalize(&mut self) {
        for entry in &mut self.model {
            entry.pattern = entry.pattern.trim().to_lowercase();
        }
        self.model.retain(|entry| !entry.pattern.is_empty());
        self.model
            .sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));
    }

    fn lookup(&self, model: &str) -> Option<usize> {
        let normalized = model.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        self.model
            .iter()
            .find(|entry| normalized.contains(&entry.pattern))
            .map(|entry| entry.context_window)
    }

    fn context_size(&self, model: &str) -> usize {
        self.lookup(model).unwrap_or(self.default_context_window)
    }
}

fn default_context_window() -> usize {
    DEFAULT_CONTEXT_SIZE
}

/// Parsed once at runtime from the embedded `templates/models.toml`.
static MODEL_CATALOG: OnceLock<ModelCatalog> = OnceLock::new();

fn model_catalog() -> &'static ModelCatalog {
    MODEL_CATALOG.get_or_init(|| {
        ModelCatalog::from_toml(include_str!("templates/models.toml")).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "embedded model catalog unreadable; using built-in table");
            ModelCatalog::from_builtin()
        })
    })
}

// ---------------------------------------------------------------------------
// Budget queries
// ---------------------------------------------------------------------------

/// Context window size for a model id.
pub fn context_size(model: &str) -> usize {
    model_catalog().context_size(model)
}

/// Tokens left for `model` after the conversation's estimate. Never negative.
pub fn remaining_tokens(conversation: &Conversation, model: &str) -> usize {
    ContextBudget::for_model(model).remaining_tokens(conversation)
}

/// Estimated share of the window in use, clamped to `0..=100`.
pub fn usage_percent(conversation: &Conversation, model: &str) -> u8 {
    ContextBudget::for_model(model).usage_percent(conversation)
}

/// True when at least `threshold` (e.g. `0.9`) of the window is used.
pub fn is_near_limit(conversation: &Conversation, model: &str, threshold: f64) -> bool {
    ContextBudget::for_model(model).is_near_limit(conversation, threshold)
}

/// Resolved context window for one model, optionally overridden by config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBudget {
    model: String,
    context_size: usize,
}

impl ContextBudget {
    pub fn for_model(model: &str) -> Self {
        Self::new(model, None)
    }

    /// An override of zero is ignored.
    pub fn new(model: &str, context_limit_override: Option<usize>) -> Self {
        let context_size = context_limit_override
            .filter(|limit| *limit > 0)
            .unwrap_or_else(|| context_size(model));
        Self {
            model: model.to_string(),
            context_size,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn context_size(&self) -> usize {
        self.context_size
    }

    pub fn used_tokens(&self, conversation: &Conversation) -> usize {
        tokens::estimate_conversation(conversation)
    }

    pub fn remaining_tokens(&self, conversation: &Conversation) -> usize {
        self.context_size
            .saturating_sub(self.used_tokens(conversation))
    }

    pub fn usage_percent(&self, conversation: &Conversation) -> u8 {
        let used = self.used_tokens(conversation) as f64;
        let percent = (used * 100.0) / self.context_size as f64;
        percent.clamp(0.0, 100.0) as u8
    }

    pub fn is_near_limit(&self, conversation: &Conversation, threshold: f64) -> bool {
        let remaining = self.remaining_tokens(conversation) as f64;
        let used_fraction = 1.0 - remaining / self.context_size as f64;
        used_fraction >= threshold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
