//! HTTP client for OpenAI-compatible chat-completion APIs.
//!
//! - `completions`: the `/chat/completions` request itself
//! - `client`: retry orchestration and the [`ModelClient`] implementation

use crate::error::ApiError;
use crate::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::SystemTime;

mod client;
mod completions;

pub use client::ApiClient;

/// Minimal chat-completion interface used by the tool loop and summarizer.
///
/// Tests provide deterministic mock responses without network calls while
/// the production path uses [`ApiClient`]. Timeouts surface as
/// [`ApiError::Http`] like any other transport failure.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for std::sync::Arc<T> {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        (**self).chat(request).await
    }
}

/// Parse a `Retry-After` header given either as seconds or as an HTTP date.
pub(crate) fn parse_retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(secs);
    }
    let when = httpdate::parse_http_date(raw).ok()?;
    Some(
        when.duration_since(SystemTime::now())
            .map(|d| d.as_secs())
            .unwrap_or(0),
    )
}
