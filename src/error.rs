//! Unified error types for the engine and its collaborators.

use serde_json::json;
use std::fmt;

// ---------------------------------------------------------------------------
// ToolError
// ---------------------------------------------------------------------------

/// Errors arising from tool execution.
///
/// These never cross the engine boundary: the tool loop converts them into an
/// `{"error": ...}` payload that is fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// The model asked for a tool that is not registered.
    UnknownTool(String),
    /// The model supplied arguments the tool couldn't parse.
    InvalidArguments(String),
    /// The tool ran but encountered a failure.
    ExecutionFailed(String),
}

impl ToolError {
    /// JSON payload sent back to the model in place of a tool result.
    pub fn to_payload(&self) -> serde_json::Value {
        json!({ "error": self.to_string() })
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool(name) => write!(f, "Unknown tool: {name}"),
            Self::InvalidArguments(msg) => write!(f, "invalid arguments: {msg}"),
            Self::ExecutionFailed(msg) => write!(f, "execution failed: {msg}"),
        }
    }
}

impl std::error::Error for ToolError {}

// ---------------------------------------------------------------------------
// ConversationError
// ---------------------------------------------------------------------------

/// Violations of the conversation log invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// A tool-role message was appended without a correlating call id.
    MissingToolCallId,
    /// A tool-role message referenced a call id no assistant message emitted.
    UnknownToolCallId(String),
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToolCallId => write!(f, "tool message is missing a tool_call_id"),
            Self::UnknownToolCallId(id) => {
                write!(f, "tool message references unknown tool call `{id}`")
            }
        }
    }
}

impl std::error::Error for ConversationError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Errors from the chat-completion transport.
#[derive(Debug)]
pub enum ApiError {
    /// Network / reqwest-level error (includes timeouts).
    Http(reqwest::Error),
    /// Non-2xx status from the API.
    Status {
        code: u16,
        body: String,
        retry_after_secs: Option<u64>,
    },
    /// The endpoint answered with a payload we could not use.
    InvalidResponse(String),
}

impl ApiError {
    pub fn status(code: u16, body: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        Self::Status {
            code,
            body: body.into(),
            retry_after_secs,
        }
    }

    /// HTTP status code, when the failure came from a non-2xx response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Server-provided `Retry-After` hint in seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Status {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Status { code, body, .. } => write!(f, "status {code}: {body}"),
            Self::InvalidResponse(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_display() {
        assert_eq!(
            ToolError::InvalidArguments("bad json".into()).to_string(),
            "invalid arguments: bad json"
        );
        assert_eq!(
            ToolError::ExecutionFailed("timeout".into()).to_string(),
            "execution failed: timeout"
        );
        assert_eq!(
            ToolError::UnknownTool("get_weather".into()).to_string(),
            "Unknown tool: get_weather"
        );
    }

    #[test]
    fn tool_error_payload_wraps_message() {
        let payload = ToolError::UnknownTool("nope".into()).to_payload();
        assert_eq!(payload["error"], "Unknown tool: nope");
        assert_eq!(payload.as_object().map(|o| o.len()), Some(1));
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e = ConfigError::from(io_err);
        let s = e.to_string();
        assert!(s.starts_with("io:"), "got: {s}");
        assert!(s.contains("file not found"));
    }

    #[test]
    fn config_error_from_toml() {
        let toml_err: toml::de::Error = toml::from_str::<toml::Value>("x = [unclosed").unwrap_err();
        let e = ConfigError::from(toml_err);
        assert!(e.to_string().starts_with("toml:"));
    }

    #[test]
    fn api_error_status_helpers() {
        let err = ApiError::status(429, "slow down", Some(7));
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.retry_after_secs(), Some(7));
        assert_eq!(err.to_string(), "status 429: slow down");

        let err = ApiError::InvalidResponse("no choices".into());
        assert_eq!(err.status_code(), None);
        assert_eq!(err.retry_after_secs(), None);
    }
}
