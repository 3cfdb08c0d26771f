//! The model invoker: one configured handle for talking to the LLM.
//!
//! [`ModelInvoker`] carries the HTTP client, backend, endpoint, model
//! configuration and optional event handler. It is constructed once at
//! startup and shared by reference (or `Arc`) with every pipeline run.

use crate::backend::{Backend, LlmRequest, OllamaBackend};
use crate::config::ModelConfig;
use crate::error::{AgentError, Result};
use crate::events::EventHandler;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Configured handle to the language model.
///
/// # Example
///
/// ```
/// use notebook_agent::{ModelConfig, ModelInvoker};
///
/// let invoker = ModelInvoker::builder(ModelConfig::default().with_model("llama3.2")).build();
/// assert_eq!(invoker.model().model, "llama3.2");
/// ```
pub struct ModelInvoker {
    /// HTTP client (cheap to clone -- uses `Arc` internally).
    pub client: Client,
    /// Base URL for the LLM provider (e.g. `http://localhost:11434`).
    pub base_url: String,
    /// LLM backend. Default: [`OllamaBackend`].
    pub backend: Arc<dyn Backend>,
    /// Optional event handler for pipeline lifecycle events.
    pub event_handler: Option<Arc<dyn EventHandler>>,
    config: ModelConfig,
}

impl ModelInvoker {
    /// Create a new builder from a model configuration.
    pub fn builder(config: ModelConfig) -> ModelInvokerBuilder {
        ModelInvokerBuilder {
            client: None,
            backend: None,
            event_handler: None,
            config,
        }
    }

    /// The model configuration this invoker was built with.
    pub fn model(&self) -> &ModelConfig {
        &self.config
    }

    /// Send `prompt` to the model and return the raw response text.
    ///
    /// No retry of any kind; transport and HTTP failures surface as
    /// [`AgentError::BackendUnavailable`].
    pub async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = LlmRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            options: self.config.options(),
        };

        tracing::debug!(
            backend = self.backend.name(),
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "invoking model"
        );

        let response = self
            .backend
            .complete(&self.client, &self.base_url, &request)
            .await
            .map_err(|e| match e {
                AgentError::BackendUnavailable(_) => e,
                other => AgentError::BackendUnavailable(format!("Ollama call failed: {}", other)),
            })?;

        let eval_count = response
            .metadata
            .as_ref()
            .and_then(|m| m.get("eval_count"))
            .and_then(|v| v.as_u64());
        tracing::debug!(
            status = response.status,
            response_chars = response.text.chars().count(),
            eval_count,
            "model responded"
        );
        Ok(response.text)
    }
}

impl std::fmt::Debug for ModelInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInvoker")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("model", &self.config.model)
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`ModelInvoker`].
pub struct ModelInvokerBuilder {
    client: Option<Client>,
    backend: Option<Arc<dyn Backend>>,
    event_handler: Option<Arc<dyn EventHandler>>,
    config: ModelConfig,
}

impl ModelInvokerBuilder {
    /// Set the HTTP client. If not set, one is built with the configured timeout.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the LLM backend. Default: [`OllamaBackend`].
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Override the request timeout from the configuration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the invoker.
    ///
    /// Falls back to a default client, without the configured timeout, if
    /// the configured one cannot be built (only when the TLS backend cannot
    /// initialize).
    pub fn build(self) -> ModelInvoker {
        let timeout = self.config.timeout;
        let client = self.client.unwrap_or_else(|| {
            Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
                tracing::warn!(
                    error = %e,
                    timeout_secs = timeout.as_secs(),
                    "could not build model HTTP client, using defaults without timeout"
                );
                Client::new()
            })
        });
        ModelInvoker {
            client,
            base_url: normalize_base_url(&self.config.base_url),
            backend: self.backend.unwrap_or_else(|| Arc::new(OllamaBackend)),
            event_handler: self.event_handler,
            config: self.config,
        }
    }
}

/// Strip known Ollama path suffixes from a base URL.
/// This prevents double-pathing when the backend appends its own path.
/// e.g., "http://localhost:11434/api" -> "http://localhost:11434"
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    // Longest first
    for suffix in &["/api/generate", "/api"] {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    trimmed.to_string()
}
