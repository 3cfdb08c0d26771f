//! Backend for Ollama's native API.
//!
//! [`OllamaBackend`] posts normalized [`LlmRequest`]s to `/api/generate`
//! with `stream: false` and returns the `response` field.

use super::{Backend, LlmRequest, LlmResponse};
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Backend for Ollama's `/api/generate` endpoint.
///
/// Every failure, transport or HTTP, is reported as
/// [`AgentError::BackendUnavailable`] with the server's error detail.
#[derive(Debug, Clone)]
pub struct OllamaBackend;

impl OllamaBackend {
    /// Build the JSON body for `/api/generate`.
    fn build_generate_body(request: &LlmRequest) -> Value {
        json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": request.options,
        })
    }

    /// Extract metadata fields from an Ollama response.
    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        for key in [
            "total_duration",
            "eval_count",
            "eval_duration",
            "prompt_eval_count",
            "model",
        ] {
            if let Some(v) = json_resp.get(key) {
                meta.insert(key.into(), v.clone());
            }
        }
        if meta.is_empty() {
            None
        } else {
            Some(Value::Object(meta))
        }
    }
}

fn unavailable(detail: impl std::fmt::Display) -> AgentError {
    AgentError::BackendUnavailable(format!("Ollama call failed: {}", detail))
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let url = format!("{}/api/generate", base_url.trim_end_matches('/'));
        let body = Self::build_generate_body(request);

        let resp = client.post(&url).json(&body).send().await.map_err(unavailable)?;
        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = if text.is_empty() {
                format!("HTTP {}", status)
            } else {
                text
            };
            return Err(unavailable(detail));
        }

        let json_resp: Value = resp.json().await.map_err(unavailable)?;
        let text = json_resp
            .get("response")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        Ok(LlmResponse {
            text,
            status,
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    fn test_request(config: &ModelConfig) -> LlmRequest {
        LlmRequest {
            model: config.model.clone(),
            prompt: "Why is the sky blue?".into(),
            options: config.options(),
        }
    }

    #[test]
    fn test_ollama_backend_generate_payload() {
        let request = test_request(&ModelConfig::default());
        let body = OllamaBackend::build_generate_body(&request);

        assert_eq!(body["model"], "mistral");
        assert_eq!(body["prompt"], "Why is the sky blue?");
        assert_eq!(body["stream"], false);
        assert!(body["options"].as_object().is_some_and(|o| o.is_empty()));
    }

    #[test]
    fn test_ollama_backend_cpu_options() {
        let config = ModelConfig::default().with_force_cpu(true).with_temperature(0.3);
        let body = OllamaBackend::build_generate_body(&test_request(&config));
        assert_eq!(body["options"]["num_gpu"], 0);
        assert_eq!(body["options"]["temperature"], 0.3);
    }

    #[test]
    fn test_extract_metadata() {
        let resp = json!({"response": "hi", "eval_count": 12, "model": "mistral", "done": true});
        let meta = OllamaBackend::extract_metadata(&resp).unwrap();
        assert_eq!(meta["eval_count"], 12);
        assert_eq!(meta["model"], "mistral");
        assert!(meta.get("done").is_none());

        assert!(OllamaBackend::extract_metadata(&json!({"response": ""})).is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_is_backend_unavailable() {
        let client = Client::new();
        let request = test_request(&ModelConfig::default());
        let err = OllamaBackend
            .complete(&client, "http://127.0.0.1:9", &request)
            .await
            .unwrap_err();
        match err {
            AgentError::BackendUnavailable(msg) => assert!(msg.starts_with("Ollama call failed:")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
