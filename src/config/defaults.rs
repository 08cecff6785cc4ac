//! Default configuration constants.
//!
//! Keeping defaults in one module lets loader and types share the same
//! literals.

/// Default OpenAI-compatible API base URL.
pub(super) const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model id sent to the endpoint.
pub(super) const DEFAULT_MODEL_ID: &str = "gpt-oss-120b";
/// Default timeout for model API requests.
pub(super) const DEFAULT_API_TIMEOUT_SECS: u64 = 120;

/// Pasted text above this many tokens is summarized.
pub(super) const DEFAULT_SUMMARY_TARGET_TOKENS: usize = 8_000;
/// Head-room kept free for the next request plus its response.
pub(super) const DEFAULT_RESERVE_TOKENS: usize = 4_000;
/// Floor for compaction summaries.
pub(super) const DEFAULT_MIN_SUMMARY_TOKENS: usize = 500;
/// Trailing messages never compacted (about two exchanges).
pub(super) const DEFAULT_PRESERVE_MESSAGES: usize = 4;
/// Safety margin against the summarizer overshooting its word target.
pub(super) const DEFAULT_SUMMARY_WORD_RATIO: f64 = 0.85;

/// Round trips allowed per user turn in the tool loop.
pub(super) const DEFAULT_MAX_ITERATIONS: usize = 3;
pub(super) const DEFAULT_TEMPERATURE: f64 = 0.3;

/// Config file name looked up locally and under the config root.
pub(super) const CONFIG_FILE_NAME: &str = "brief.toml";
/// Directory under the platform config root.
pub(super) const CONFIG_DIR_NAME: &str = "brief";
