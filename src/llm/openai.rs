//! OpenAI-compatible chat-completion client
//!
//! Talks to `POST {base_url}/chat/completions` with a bearer token. Works with
//! the OpenAI API and with servers that mimic it.
//!
//! # Example
//!
//! ```ignore
//! use fillme::llm::{ChatClient, ChatRequest, Message, OpenAiClient};
//!
//! let client = OpenAiClient::new("sk-...").with_timeout(60);
//! let request = ChatRequest::new("gpt-3.5-turbo", vec![Message::user("Say 'ok' lower case.")]);
//! let response = client.complete(&request)?;
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::client::{ChatClient, CompletionResponse};
use super::error::{LlmError, LlmResult};
use super::message::{ChatRequest, Message};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Blocking client for OpenAI-compatible chat completions
#[derive(Clone)]
pub struct OpenAiClient {
    /// Base URL of the API, without trailing slash
    base_url: String,
    /// Bearer token
    api_key: String,
    /// Request timeout in seconds
    timeout_seconds: u64,
    /// HTTP client
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Request body for the chat completions endpoint
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response from the chat completions endpoint
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl OpenAiClient {
    /// Create a client for the public OpenAI API
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout_seconds: 120,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Use another OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl ChatClient for OpenAiClient {
    fn complete(&self, request: &ChatRequest) -> LlmResult<CompletionResponse> {
        let url = self.endpoint();
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
        };

        tracing::debug!(url = %url, model = %request.model, "sending chat completion request");
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    LlmError::ConnectionError(format!(
                        "Failed to connect to {}: {}",
                        self.base_url, e
                    ))
                } else {
                    LlmError::ConnectionError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited(60));
            }
            let error_text = response.text().unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&error_text),
            });
        }

        let text = response
            .text()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;
        let completion = parse_completion(&text)?;
        let completion = completion.with_duration(start.elapsed().as_millis() as u64);

        tracing::debug!(
            "chat completion took {} ms, {} prompt tokens, {} completion tokens",
            completion.duration_ms.unwrap_or(0),
            completion.prompt_tokens.unwrap_or(0),
            completion.completion_tokens.unwrap_or(0)
        );

        Ok(completion)
    }

    fn backend_name(&self) -> &str {
        &self.base_url
    }
}

/// Decode a chat completions response body
fn parse_completion(body: &str) -> LlmResult<CompletionResponse> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)?;

    let mut completion = CompletionResponse {
        choices: parsed
            .choices
            .into_iter()
            .map(|c| c.message.content.unwrap_or_default())
            .collect(),
        model: parsed.model,
        ..Default::default()
    };
    if let Some(usage) = parsed.usage {
        completion = completion.with_tokens(usage.prompt_tokens, usage.completion_tokens);
    }
    Ok(completion)
}

/// Pull the message out of an error body, falling back to the raw text
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OpenAiClient::new("sk-test")
            .with_base_url("http://localhost:8080/v1/")
            .with_timeout(30);
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.timeout_seconds, 30);
        assert_eq!(OpenAiClient::new("k").base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_request_serialize() {
        let messages = vec![Message::system("be terse"), Message::user("hello")];
        let request = ChatCompletionRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
            temperature: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-3.5-turbo-0125",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "INSERT INTO t VALUES (1);"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 40, "completion_tokens": 9, "total_tokens": 49}
        }"#;

        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.first_choice(), Some("INSERT INTO t VALUES (1);"));
        assert_eq!(completion.model.as_deref(), Some("gpt-3.5-turbo-0125"));
        assert_eq!(completion.prompt_tokens, Some(40));
        assert_eq!(completion.completion_tokens, Some(9));
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let completion = parse_completion(r#"{"choices": []}"#).unwrap();
        assert!(completion.choices.is_empty());

        let completion = parse_completion(r#"{"object": "chat.completion"}"#).unwrap();
        assert!(completion.choices.is_empty());
    }

    #[test]
    fn test_parse_completion_null_content() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.first_choice(), Some(""));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "Incorrect API key provided");
        assert_eq!(api_error_message("  Bad Gateway \n"), "Bad Gateway");
    }
}
