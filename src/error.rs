//! Error types for a fill run
//!
//! Every failure of the pipeline surfaces as one [`FillError`] kind. Lower
//! layers ([`crate::database::DatabaseError`], [`crate::llm::LlmError`]) keep
//! their own error types and are mapped into these kinds at the pipeline
//! boundary, keeping the underlying message.

use thiserror::Error;

/// Errors that can abort a fill run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FillError {
    /// Database unreachable at startup or during reflection
    #[error("could not connect to database: {0}")]
    Connection(String),

    /// Missing credential or invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Completion service failed the liveness check
    #[error("completion service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Completion service did not produce any SQL
    #[error("failed to generate dummy data: {0}")]
    GenerationFailed(String),

    /// Generated SQL could not be executed or committed
    #[error("failed to put generated data into tables: {0}")]
    ExecutionFailed(String),
}

/// Result type for fill operations
pub type FillResult<T> = Result<T, FillError>;

impl FillError {
    /// Short, stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            FillError::Connection(_) => "connection",
            FillError::Configuration(_) => "configuration",
            FillError::ServiceUnavailable(_) => "service_unavailable",
            FillError::GenerationFailed(_) => "generation_failed",
            FillError::ExecutionFailed(_) => "execution_failed",
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            FillError::Connection(msg) => {
                format!(
                    "Could not connect to database: {msg}\n\n\
                    Hints:\n\
                    - Check the --db-url value\n\
                    - For DuckDB files, make sure no other process holds a write lock"
                )
            }
            FillError::Configuration(msg) => {
                format!(
                    "Configuration error: {msg}\n\n\
                    Hints:\n\
                    - Set OPENAI_API_KEY or pass --openai-token\n\
                    - Check the values in your config file"
                )
            }
            FillError::ServiceUnavailable(msg) => {
                format!(
                    "Completion service is not usable: {msg}\n\n\
                    Hints:\n\
                    - Verify the API key is valid\n\
                    - Check --base-url and --model"
                )
            }
            FillError::ExecutionFailed(msg) => {
                format!(
                    "Failed to put generated data into tables: {msg}\n\n\
                    Hint: Use --dry-run to inspect the generated SQL."
                )
            }
            FillError::GenerationFailed(_) => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FillError::Connection("file is locked".to_string());
        assert_eq!(
            err.to_string(),
            "could not connect to database: file is locked"
        );

        let err = FillError::ExecutionFailed("syntax error at or near \"INSRT\"".to_string());
        assert_eq!(
            err.to_string(),
            "failed to put generated data into tables: syntax error at or near \"INSRT\""
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(FillError::Configuration(String::new()).kind(), "configuration");
        assert_eq!(
            FillError::ServiceUnavailable(String::new()).kind(),
            "service_unavailable"
        );
        assert_eq!(
            FillError::GenerationFailed(String::new()).kind(),
            "generation_failed"
        );
    }

    #[test]
    fn test_user_message_has_hints() {
        let msg = FillError::Configuration("missing API key".to_string()).user_message();
        assert!(msg.contains("missing API key"));
        assert!(msg.contains("OPENAI_API_KEY"));

        let msg = FillError::GenerationFailed("no choices".to_string()).user_message();
        assert_eq!(msg, "failed to generate dummy data: no choices");
    }
}
