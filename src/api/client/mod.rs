//! API client orchestration for OpenAI-compatible chat transports.
//!
//! The client facade stays small: the wire request lives in `completions`
//! and the retry policy in `retry`.

mod retry;

use super::completions;
use super::ModelClient;
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use retry::RetryPolicy;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Client for OpenAI-compatible chat-completion APIs.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retry_policy: RetryPolicy,
}

impl ApiClient {
    /// Build a client from resolved API configuration.
    pub fn new(config: &ApiConfig) -> Self {
        Self::new_with_retry_policy(
            config,
            Duration::from_secs(config.timeout_secs.max(1)),
            RetryPolicy::default(),
        )
    }

    fn new_with_retry_policy(
        config: &ApiConfig,
        timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            http: build_http_client(timeout),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
            retry_policy,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a chat request, retrying transient failures.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let bearer = (!self.api_key.is_empty()).then_some(self.api_key.as_str());
        let mut attempt: u32 = 0;
        loop {
            match completions::request(&self.http, &self.base_url, request, bearer).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if !self.retry_policy.should_retry(&err, attempt) {
                        debug!(attempt, error = %err, "chat request failed");
                        return Err(err);
                    }
                    let delay = self.retry_policy.retry_delay_for(attempt, &err);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying chat request"
                    );
                    attempt = attempt.saturating_add(1);
                    sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl ModelClient for ApiClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        ApiClient::chat(self, request).await
    }
}

/// Build an HTTP client with timeout applied.
fn build_http_client(timeout: Duration) -> reqwest::Client {
    // Fall back to reqwest defaults if builder creation fails for any reason.
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn api_config(base_url: String, api_key: &str) -> ApiConfig {
        ApiConfig {
            base_url,
            api_key: api_key.to_string(),
            model: "dummy-model".to_string(),
            ..ApiConfig::default()
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "dummy-model".to_string(),
            messages: vec![ChatMessage::user("hello")],
            tools: None,
            temperature: None,
        }
    }

    fn fast_retries() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Read one full HTTP request (headers plus Content-Length body).
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.expect("read");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve canned responses, one per connection, recording raw requests.
    async fn serve(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_server = Arc::clone(&seen);
        tokio::spawn(async move {
            for response in responses {
                let (mut stream, _) = listener.accept().await.expect("accept");
                let raw = read_request(&mut stream).await;
                seen_server.lock().expect("lock").push(raw);
                stream.write_all(response.as_bytes()).await.expect("write");
                stream.shutdown().await.ok();
            }
        });
        (format!("http://{addr}"), seen)
    }

    const OK_BODY: &str = r#"{"id":"r1","choices":[{"index":0,"message":{"role":"assistant","content":"hi there"},"finish_reason":"stop"}]}"#;

    #[tokio::test]
    async fn chat_parses_response_and_sends_bearer() {
        let (base_url, seen) = serve(vec![http_response("200 OK", OK_BODY)]).await;
        let client = ApiClient::new(&api_config(format!("{base_url}/"), "sk-test"));
        assert_eq!(client.base_url(), base_url);

        let response = client.chat(&request()).await.expect("chat ok");
        let message = response.into_first_message().expect("message");
        assert_eq!(message.content.as_deref(), Some("hi there"));

        let raw = seen.lock().unwrap()[0].to_lowercase();
        assert!(raw.starts_with("post /chat/completions"), "got: {raw}");
        assert!(raw.contains("authorization: bearer sk-test"));
    }

    #[tokio::test]
    async fn chat_omits_auth_header_without_key() {
        let (base_url, seen) = serve(vec![http_response("200 OK", OK_BODY)]).await;
        let client = ApiClient::new(&api_config(base_url, ""));
        client.chat(&request()).await.expect("chat ok");
        let raw = seen.lock().unwrap()[0].to_lowercase();
        assert!(!raw.contains("authorization:"));
    }

    #[tokio::test]
    async fn chat_retries_server_errors() {
        let (base_url, seen) = serve(vec![
            http_response("503 Service Unavailable", "{}"),
            http_response("200 OK", OK_BODY),
        ])
        .await;
        let client = ApiClient::new_with_retry_policy(
            &api_config(base_url, ""),
            Duration::from_secs(5),
            fast_retries(),
        );
        client.chat(&request()).await.expect("second attempt succeeds");
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn chat_does_not_retry_client_errors() {
        let (base_url, _seen) =
            serve(vec![http_response("401 Unauthorized", r#"{"error":"bad key"}"#)]).await;
        let client = ApiClient::new_with_retry_policy(
            &api_config(base_url, "sk-bad"),
            Duration::from_secs(5),
            fast_retries(),
        );
        let err = client.chat(&request()).await.expect_err("401 is terminal");
        assert_eq!(err.status_code(), Some(401));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let (base_url, _seen) = serve(vec![http_response("200 OK", "not json")]).await;
        let client = ApiClient::new(&api_config(base_url, ""));
        let err = client.chat(&request()).await.expect_err("malformed");
        assert!(matches!(err, ApiError::InvalidResponse(_)), "got: {err}");
    }

    #[tokio::test]
    async fn api_client_respects_timeout_policy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept one connection and keep it open so the client must time out.
        let _accept = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = ApiClient::new_with_retry_policy(
            &api_config(format!("http://{addr}"), "test-key"),
            Duration::from_millis(50),
            RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            },
        );
        let err = client.chat(&request()).await.expect_err("timeout expected");
        match err {
            ApiError::Http(inner) => {
                assert!(inner.is_timeout(), "unexpected error: {inner}");
            }
            other => panic!("expected timeout Http error, got: {other}"),
        }
    }
}
