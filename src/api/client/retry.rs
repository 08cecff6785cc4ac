//! Bounded retry for transient chat-completion failures.
//!
//! Timeouts and connection failures retry like 429/5xx responses; anything
//! else goes straight back to the caller.

use crate::error::ApiError;
use std::time::Duration;

/// Longest `Retry-After` the client will honour.
const MAX_RETRY_AFTER_SECS: u64 = 300;

#[derive(Clone, Copy, Debug)]
pub(super) struct RetryPolicy {
    /// Total attempts, the first request included.
    pub(super) max_attempts: u32,
    pub(super) initial_backoff: Duration,
    pub(super) max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// `attempt` is zero-based: the attempt that just failed.
    pub(super) fn should_retry(&self, err: &ApiError, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts && is_transient(err)
    }

    /// Server-provided `Retry-After` wins over exponential backoff.
    pub(super) fn retry_delay_for(&self, attempt: u32, err: &ApiError) -> Duration {
        if let Some(seconds) = err.retry_after_secs() {
            return Duration::from_secs(seconds.clamp(1, MAX_RETRY_AFTER_SECS));
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

fn is_transient(err: &ApiError) -> bool {
    match err {
        ApiError::Http(inner) => inner.is_timeout() || inner.is_connect(),
        ApiError::Status { code, .. } => *code == 429 || (500..=599).contains(code),
        ApiError::InvalidResponse(_) => false,
    }
}
