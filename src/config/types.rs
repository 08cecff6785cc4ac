//! Configuration data model.
//!
//! Struct/enum definitions plus default values. Loading and precedence live in
//! `config::mod` and `config::env`.

use serde::Deserialize;

use super::defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_API_TIMEOUT_SECS, DEFAULT_MAX_ITERATIONS,
    DEFAULT_MIN_SUMMARY_TOKENS, DEFAULT_MODEL_ID, DEFAULT_PRESERVE_MESSAGES,
    DEFAULT_RESERVE_TOKENS, DEFAULT_SUMMARY_TARGET_TOKENS, DEFAULT_SUMMARY_WORD_RATIO,
    DEFAULT_TEMPERATURE,
};

/// Which source wins for connection settings when both are present.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigPriority {
    /// Environment variables override the config file.
    #[default]
    Env,
    /// The config file overrides environment variables.
    Config,
}

impl ConfigPriority {
    pub(super) fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("config") {
            Self::Config
        } else {
            Self::Env
        }
    }
}

/// Top-level runtime configuration, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api: ApiConfig,
    pub summary: SummaryConfig,
    pub agent: AgentConfig,
    pub display: DisplayConfig,
    /// Resolved priority used while loading.
    pub priority: ConfigPriority,
}

/// Resolved endpoint connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Empty for local servers that need no key.
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Override for context window size. Auto-detected from model name if omitted.
    pub context_limit: Option<usize>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
            api_key: String::new(),
            model: DEFAULT_MODEL_ID.into(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            context_limit: None,
        }
    }
}

impl ApiConfig {
    /// True when the endpoint is the hosted OpenAI API.
    pub fn is_default_endpoint(&self) -> bool {
        self.base_url.trim_end_matches('/') == DEFAULT_API_BASE_URL
    }
}

/// Summarization / compaction tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub enabled: bool,
    /// Paste size (tokens) above which pasted text is summarized.
    pub target_tokens: usize,
    /// Tokens kept free for the next request plus response.
    pub reserve_tokens: usize,
    pub min_summary_tokens: usize,
    /// Trailing messages never compacted.
    pub preserve_messages: usize,
    pub word_ratio: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_tokens: DEFAULT_SUMMARY_TARGET_TOKENS,
            reserve_tokens: DEFAULT_RESERVE_TOKENS,
            min_summary_tokens: DEFAULT_MIN_SUMMARY_TOKENS,
            preserve_messages: DEFAULT_PRESERVE_MESSAGES,
            word_ratio: DEFAULT_SUMMARY_WORD_RATIO,
        }
    }
}

/// Tool loop behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Durable system preamble seeded into new conversations.
    pub system_prompt: String,
    /// Safety cap on tool-loop round trips.
    pub max_iterations: usize,
    pub temperature: Option<f64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            temperature: Some(DEFAULT_TEMPERATURE),
        }
    }
}

/// Display preferences for the CLI host.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub color: bool,
    /// Print tool results as they are fed back to the model.
    pub show_tool_output: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            show_tool_output: false,
        }
    }
}

/// On-disk shape. Connection values stay optional so priority can be applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileConfig {
    pub(super) priority: Option<ConfigPriority>,
    pub(super) api: FileApiConfig,
    pub(super) summary: SummaryConfig,
    pub(super) agent: AgentConfig,
    pub(super) display: DisplayConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileApiConfig {
    pub(super) base_url: Option<String>,
    pub(super) api_key: Option<String>,
    pub(super) model: Option<String>,
    pub(super) timeout_secs: Option<u64>,
    pub(super) context_limit: Option<usize>,
}
