//! OCR through the `tesseract` command-line tool.

use super::TextExtractor;
use crate::config::MediaConfig;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Runs `<tesseract> <image> stdout` and returns the trimmed output.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    program: String,
}

impl TesseractOcr {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.tesseract_path.clone())
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl TextExtractor for TesseractOcr {
    async fn extract_text(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.program)
            .arg(path)
            .arg("stdout")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AgentError::Media(format!("could not run {}: {}", self.program, e)))?;

        if !output.status.success() {
            // Unreadable images are not fatal.
            tracing::warn!(
                path = %path.display(),
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "tesseract failed"
            );
            return Ok(String::new());
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(path = %path.display(), chars = text.chars().count(), "ocr complete");
        Ok(text)
    }
}
