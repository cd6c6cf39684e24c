//! Chat-completion client trait
//!
//! The generator only needs one call from a completion service: send a list
//! of role-tagged messages for a model and get back the candidate texts.
//! [`ChatClient`] is that call; [`crate::llm::OpenAiClient`] implements it
//! over HTTP.

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::VecDeque;

#[cfg(test)]
use super::error::LlmError;
use super::error::LlmResult;
use super::message::ChatRequest;

/// Trait for chat-completion backends
pub trait ChatClient {
    /// Send one chat request and return all candidate completions
    ///
    /// An empty `choices` list is a valid response; callers decide what it
    /// means.
    fn complete(&self, request: &ChatRequest) -> LlmResult<CompletionResponse>;

    /// Human-readable name of the backend, for logs
    fn backend_name(&self) -> &str;
}

impl<C: ChatClient + ?Sized> ChatClient for &C {
    fn complete(&self, request: &ChatRequest) -> LlmResult<CompletionResponse> {
        (**self).complete(request)
    }

    fn backend_name(&self) -> &str {
        (**self).backend_name()
    }
}

/// Response from a chat-completion request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Text of each candidate completion, in service order
    pub choices: Vec<String>,
    /// Model that served the request, when reported
    pub model: Option<String>,
    /// Number of tokens in the prompt
    pub prompt_tokens: Option<usize>,
    /// Number of tokens generated
    pub completion_tokens: Option<usize>,
    /// Time taken for completion in milliseconds
    pub duration_ms: Option<u64>,
}

impl CompletionResponse {
    /// Create a response with a single choice
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            choices: vec![text.into()],
            ..Default::default()
        }
    }

    /// Create a response without any choice
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set token counts
    pub fn with_tokens(mut self, prompt: usize, completion: usize) -> Self {
        self.prompt_tokens = Some(prompt);
        self.completion_tokens = Some(completion);
        self
    }

    /// Set duration
    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    /// Text of the first candidate
    pub fn first_choice(&self) -> Option<&str> {
        self.choices.first().map(String::as_str)
    }
}

/// A mock chat client for testing
///
/// Replays queued responses in order and records every request it receives.
/// Once the queue is empty it keeps answering with the fallback response.
#[cfg(test)]
pub struct MockChatClient {
    responses: RefCell<VecDeque<LlmResult<CompletionResponse>>>,
    fallback: CompletionResponse,
    requests: RefCell<Vec<ChatRequest>>,
}

#[cfg(test)]
impl MockChatClient {
    /// Mock that passes the liveness check and then returns `sql`
    pub fn new(sql: impl Into<String>) -> Self {
        Self::scripted(vec![
            Ok(CompletionResponse::new("ok")),
            Ok(CompletionResponse::new(sql)),
        ])
    }

    /// Mock that returns the given responses in order
    pub fn scripted(responses: Vec<LlmResult<CompletionResponse>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            fallback: CompletionResponse::empty(),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Mock whose every call fails with a connection error
    pub fn failing() -> Self {
        Self::scripted(vec![Err(LlmError::ConnectionError(
            "Mock failure".to_string(),
        ))])
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

#[cfg(test)]
impl ChatClient for MockChatClient {
    fn complete(&self, request: &ChatRequest) -> LlmResult<CompletionResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::Message;

    #[test]
    fn test_mock_client_replays_in_order() {
        let client = MockChatClient::new("INSERT INTO t VALUES (1);");
        let request = ChatRequest::new("mock-model", vec![Message::user("hi")]);

        let first = client.complete(&request).unwrap();
        assert_eq!(first.first_choice(), Some("ok"));
        let second = client.complete(&request).unwrap();
        assert_eq!(second.first_choice(), Some("INSERT INTO t VALUES (1);"));
        let third = client.complete(&request).unwrap();
        assert!(third.choices.is_empty());

        assert_eq!(client.call_count(), 3);
        assert_eq!(client.requests()[0].model, "mock-model");
    }

    #[test]
    fn test_mock_client_failure() {
        let client = MockChatClient::failing();
        let result = client.complete(&ChatRequest::new("m", vec![]));
        assert!(result.is_err());
    }

    #[test]
    fn test_completion_response() {
        let response = CompletionResponse::new("Generated text")
            .with_tokens(100, 50)
            .with_duration(1500);

        assert_eq!(response.first_choice(), Some("Generated text"));
        assert_eq!(response.prompt_tokens, Some(100));
        assert_eq!(response.completion_tokens, Some(50));
        assert_eq!(response.duration_ms, Some(1500));
        assert_eq!(CompletionResponse::empty().first_choice(), None);
    }
}
