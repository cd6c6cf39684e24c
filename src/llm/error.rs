//! Error types for chat-completion calls

use thiserror::Error;

/// Errors that can occur while talking to a chat-completion service
#[derive(Error, Debug)]
pub enum LlmError {
    /// Failed to connect to the service
    #[error("Failed to connect to LLM service: {0}")]
    ConnectionError(String),

    /// Request timeout
    #[error("LLM request timed out after {0} seconds")]
    Timeout(u64),

    /// Service answered with an error status
    #[error("LLM API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limiting
    #[error("Rate limited by LLM service, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body could not be decoded
    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::ParseError(err.to_string())
    }
}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Whether the service rejected the credential
    pub fn is_auth_error(&self) -> bool {
        matches!(self, LlmError::Api { status: 401 | 403, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LlmError::Api {
            status: 401,
            message: "Incorrect API key provided".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "LLM API error (HTTP 401): Incorrect API key provided"
        );
        assert!(err.is_auth_error());

        let err = LlmError::Timeout(30);
        assert_eq!(err.to_string(), "LLM request timed out after 30 seconds");
        assert!(!err.is_auth_error());
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let llm_err: LlmError = json_err.into();
        assert!(matches!(llm_err, LlmError::ParseError(_)));
    }
}
