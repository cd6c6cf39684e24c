//! Chat-completion access
//!
//! This module provides the narrow interface the dummy-data generator uses to
//! talk to a chat-completion service.
//!
//! # Features
//!
//! - **`ChatClient`**: one call, role-tagged messages in, candidate texts out
//! - **`OpenAiClient`**: blocking HTTP client for OpenAI-compatible APIs
//!   (requires the `api-backend` feature)

pub mod client;
pub mod error;
pub mod message;
#[cfg(feature = "api-backend")]
pub mod openai;

// Re-export main types
pub use client::{ChatClient, CompletionResponse};
pub use error::{LlmError, LlmResult};
pub use message::{ChatRequest, Message, MessageRole};
#[cfg(feature = "api-backend")]
pub use openai::OpenAiClient;

#[cfg(test)]
pub use client::MockChatClient;
