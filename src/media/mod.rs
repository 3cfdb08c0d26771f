//! Turning uploaded images and audio into text.
//!
//! Both collaborators are single attempts; the agent never retries them.

pub mod ocr;
pub mod stt;

pub use ocr::TesseractOcr;
pub use stt::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Optical character recognition.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Text found in the image at `path`; empty when nothing is readable.
    async fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Speech to text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Recognized segments of the audio at `path`, joined in order.
    async fn transcribe(&self, path: &Path) -> Result<String>;
}
