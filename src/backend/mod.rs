//! Backend trait and normalized request/response types.
//!
//! The [`Backend`] trait abstracts over the language-model provider,
//! translating between a normalized [`LlmRequest`]/[`LlmResponse`] pair and
//! the provider's HTTP API. Built-in implementations: [`OllamaBackend`] and,
//! for tests, [`MockBackend`].
//!
//! ## Architecture
//!
//! ```text
//! ModelInvoker ──► LlmRequest ──► Backend::complete() ──► LlmResponse
//!                                        │
//!                              ┌─────────┴─────────┐
//!                         OllamaBackend        MockBackend
//!                         /api/generate        canned responses
//! ```
//!
//! There is no transport-level retry: a failed call surfaces immediately as
//! [`AgentError::BackendUnavailable`](crate::AgentError::BackendUnavailable).

pub mod mock;
pub mod ollama;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;

use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// A normalized LLM request.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Model identifier (e.g. `"mistral"`).
    pub model: String,

    /// The full prompt text.
    pub prompt: String,

    /// Provider options (`num_gpu`, `temperature`, ...), passed through as-is.
    pub options: Value,
}

/// A normalized LLM response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated text content.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token counts, timing, model info).
    pub metadata: Option<Value>,
}

/// Abstraction over LLM providers.
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute a single non-streaming completion.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}
