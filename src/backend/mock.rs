//! Mock backend for testing without a live LLM.
//!
//! [`MockBackend`] returns pre-configured responses in order and records
//! every prompt it was sent, so tests can assert on call counts and on what
//! the pipeline asked the model.
//!
//! # Example
//!
//! ```
//! use notebook_agent::backend::MockBackend;
//!
//! let mock = MockBackend::new(vec!["no json here".to_string(), "{}".to_string()]);
//! assert_eq!(mock.calls(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use super::{Backend, LlmRequest, LlmResponse};
use crate::error::{AgentError, Result};

/// A test backend that returns canned responses in order.
///
/// Cycles back to the beginning when all responses have been consumed.
#[derive(Debug)]
pub struct MockBackend {
    responses: Vec<String>,
    index: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    /// Zero-based call index from which every call fails, and the message.
    failure: Option<(usize, String)>,
}

impl MockBackend {
    /// Create a mock backend with the given canned responses.
    pub fn new(responses: Vec<String>) -> Self {
        assert!(!responses.is_empty(), "MockBackend requires at least one response");
        Self {
            responses,
            index: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// Create a mock that always returns the same response.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Create a mock whose every call fails with `BackendUnavailable`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::failing_after(vec![String::new()], 0, message)
    }

    /// Create a mock that answers the first `ok_calls` calls from `responses`
    /// and fails every later call with `BackendUnavailable`.
    pub fn failing_after(responses: Vec<String>, ok_calls: usize, message: impl Into<String>) -> Self {
        Self {
            failure: Some((ok_calls, message.into())),
            ..Self::new(responses)
        }
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_response(&self) -> String {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.responses.len();
        self.responses[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let call = match self.prompts.lock() {
            Ok(mut prompts) => {
                prompts.push(request.prompt.clone());
                prompts.len() - 1
            }
            Err(_) => 0,
        };
        if let Some((ok_calls, ref message)) = self.failure {
            if call >= ok_calls {
                return Err(AgentError::BackendUnavailable(message.clone()));
            }
        }
        Ok(LlmResponse {
            text: self.next_response(),
            status: 200,
            metadata: None,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(prompt: &str) -> LlmRequest {
        LlmRequest {
            model: "test".to_string(),
            prompt: prompt.to_string(),
            options: json!({}),
        }
    }

    #[tokio::test]
    async fn test_mock_fixed_response() {
        let mock = MockBackend::fixed("Hello!");
        let client = Client::new();
        let resp = mock.complete(&client, "http://unused", &request("p")).await.unwrap();
        assert_eq!(resp.text, "Hello!");
        assert_eq!(resp.status, 200);
    }

    #[tokio::test]
    async fn test_mock_cycles_and_records() {
        let mock = MockBackend::new(vec!["first".into(), "second".into()]);
        let client = Client::new();
        let r1 = mock.complete(&client, "http://unused", &request("a")).await.unwrap();
        let r2 = mock.complete(&client, "http://unused", &request("b")).await.unwrap();
        let r3 = mock.complete(&client, "http://unused", &request("c")).await.unwrap();
        assert_eq!(r1.text, "first");
        assert_eq!(r2.text, "second");
        assert_eq!(r3.text, "first"); // cycles
        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let mock = MockBackend::failing("connection refused");
        let client = Client::new();
        let err = mock.complete(&client, "http://unused", &request("a")).await.unwrap_err();
        assert!(matches!(err, AgentError::BackendUnavailable(ref m) if m == "connection refused"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing_after_first_call() {
        let mock = MockBackend::failing_after(vec!["prose".into()], 1, "down");
        let client = Client::new();
        let r1 = mock.complete(&client, "http://unused", &request("a")).await.unwrap();
        assert_eq!(r1.text, "prose");
        let err = mock.complete(&client, "http://unused", &request("b")).await.unwrap_err();
        assert!(matches!(err, AgentError::BackendUnavailable(ref m) if m == "down"));
        assert_eq!(mock.calls(), 2);
    }
}
