//! One POST to `/chat/completions`.

use crate::api::parse_retry_after_secs;
use crate::error::ApiError;
use crate::textutil::truncate_with_suffix_by_chars;
use crate::types::{ChatRequest, ChatResponse};
use tracing::debug;

/// Error bodies are kept for diagnostics but capped.
const MAX_ERROR_BODY_CHARS: usize = 2_000;

pub(crate) async fn request(
    http: &reqwest::Client,
    base_url: &str,
    chat: &ChatRequest,
    api_key: Option<&str>,
) -> Result<ChatResponse, ApiError> {
    let endpoint = format!("{base_url}/chat/completions");
    let mut builder = http.post(&endpoint).json(chat);
    // Local servers (LM Studio, Ollama) run without a key.
    if let Some(key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
        builder = builder.bearer_auth(key);
    }

    let response = builder.send().await?;
    let status = response.status();
    debug!(%endpoint, status = status.as_u16(), model = %chat.model, "chat completion returned");
    if !status.is_success() {
        let retry_after_secs = parse_retry_after_secs(response.headers());
        let body = response.text().await.unwrap_or_default();
        let body = truncate_with_suffix_by_chars(&body, MAX_ERROR_BODY_CHARS, "...");
        return Err(ApiError::status(status.as_u16(), body, retry_after_secs));
    }

    let raw = response.text().await?;
    serde_json::from_str::<ChatResponse>(&raw)
        .map_err(|e| ApiError::InvalidResponse(format!("malformed chat completion: {e}")))
}
