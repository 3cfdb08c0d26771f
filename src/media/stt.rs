//! Speech to text through an OpenAI-compatible transcription endpoint
//! (faster-whisper-server, whisper.cpp server, and similar).

use super::Transcriber;
use crate::config::MediaConfig;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::path::Path;

/// Uploads audio to a `/v1/audio/transcriptions` endpoint.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    client: Client,
    url: String,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(client: Client, url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            model: model.into(),
        }
    }

    pub fn from_config(client: Client, config: &MediaConfig) -> Self {
        Self::new(client, config.whisper_url.clone(), config.whisper_model.clone())
    }
}

fn media_err(e: impl std::fmt::Display) -> AgentError {
    AgentError::Media(format!("transcription failed: {}", e))
}

/// Segment texts joined by single spaces, or the top-level `text`.
fn transcript_text(data: &Value) -> String {
    if let Some(segments) = data.get("segments").and_then(Value::as_array) {
        let parts: Vec<&str> = segments
            .iter()
            .filter_map(|seg| seg.get("text").and_then(Value::as_str))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if !parts.is_empty() {
            return parts.join(" ");
        }
    }
    data.get("text")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string()
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await.map_err(media_err)?;
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(media_err)?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        let resp = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(media_err)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(media_err(format!("HTTP {}: {}", status, body)));
        }

        let data: Value = resp.json().await.map_err(media_err)?;
        let text = transcript_text(&data);
        tracing::debug!(path = %path.display(), chars = text.chars().count(), "transcription complete");
        Ok(text)
    }
}
