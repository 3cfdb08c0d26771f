//! Request orchestration: input text → summary → destination → page.
//!
//! ```text
//! NoteRequest ─► input text (text | OCR | STT | file name)
//!     ├─ override notebook+section ─► summary prompt ─────────────────────► persist(override)
//!     └─ otherwise ─► inventory ─► StructuredPipeline ─► resolve(defaults) ─► persist(route)
//! ```
//!
//! A failed write never fails the request. The error is appended to the
//! summary so the caller keeps the text.

use crate::error::{AgentError, Result};
use crate::media::{TextExtractor, Transcriber};
use crate::pipeline::StructuredPipeline;
use crate::prompt;
use crate::resolver::resolve;
use crate::store::DestinationStore;
use crate::types::{DestinationInventory, Route};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// How the input text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Text,
    Image,
    Audio,
}

impl InputMode {
    /// Mode implied by an upload's content type, if any.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if content_type.starts_with("image/") {
            Some(InputMode::Image)
        } else if content_type.starts_with("audio/") {
            Some(InputMode::Audio)
        } else {
            None
        }
    }
}

impl FromStr for InputMode {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(InputMode::Text),
            "image" => Ok(InputMode::Image),
            "audio" => Ok(InputMode::Audio),
            other => Err(AgentError::InvalidInput(format!("Unknown mode '{}'", other))),
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputMode::Text => "text",
            InputMode::Image => "image",
            InputMode::Audio => "audio",
        })
    }
}

/// An upload already saved to disk.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub content_type: Option<String>,
    pub file_name: String,
}

/// One summarize-and-file request.
#[derive(Debug, Clone, Default)]
pub struct NoteRequest {
    pub text: Option<String>,
    pub file: Option<UploadedFile>,
    pub mode: Option<InputMode>,
    pub target_notebook: Option<String>,
    pub target_section: Option<String>,
}

impl NoteRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Skip routing and write to this notebook and section.
    pub fn with_target(mut self, notebook: impl Into<String>, section: impl Into<String>) -> Self {
        self.target_notebook = Some(notebook.into());
        self.target_section = Some(section.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteResponse {
    pub summary_md: String,
    pub route: Route,
    pub raw_llm: Option<String>,
    pub mode: InputMode,
}

/// Ties the pipeline, the store and the media collaborators together.
#[derive(Clone)]
pub struct NoteAgent {
    pipeline: StructuredPipeline,
    store: Arc<dyn DestinationStore>,
    ocr: Arc<dyn TextExtractor>,
    stt: Arc<dyn Transcriber>,
    default_notebook: Option<String>,
    default_section: Option<String>,
}

impl NoteAgent {
    pub fn new(
        pipeline: StructuredPipeline,
        store: Arc<dyn DestinationStore>,
        ocr: Arc<dyn TextExtractor>,
        stt: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            pipeline,
            store,
            ocr,
            stt,
            default_notebook: None,
            default_section: None,
        }
    }

    /// Destination used when the model's choice is not in the inventory.
    pub fn with_defaults(mut self, notebook: Option<String>, section: Option<String>) -> Self {
        self.default_notebook = notebook;
        self.default_section = section;
        self
    }

    /// Current notebooks and sections, fetched from the store.
    pub async fn destinations(&self) -> Result<DestinationInventory> {
        self.store.list_destinations().await
    }

    pub async fn handle(&self, request: NoteRequest) -> Result<NoteResponse> {
        let (input, mode) = self.input_text(&request).await?;
        tracing::info!(%mode, input_chars = input.chars().count(), "handling note");

        if let (Some(notebook), Some(section)) = (&request.target_notebook, &request.target_section) {
            let mut summary = self.pipeline.invoker().invoke(&prompt::summary_prompt(&input)).await?;
            let route = Route::new(notebook.clone(), section.clone());
            self.persist(&mut summary, &route).await;
            return Ok(NoteResponse {
                summary_md: summary,
                route,
                raw_llm: None,
                mode,
            });
        }

        let inventory = self.store.list_destinations().await?;
        let output = self.pipeline.run(&input, &inventory).await?;
        let route = resolve(
            &output.route,
            &inventory,
            self.default_notebook.as_deref(),
            self.default_section.as_deref(),
        );
        if route != output.route {
            tracing::info!(
                suggested = ?output.route,
                resolved = ?route,
                "model route replaced by fallback destination"
            );
        }

        let mut summary = output.summary_md;
        self.persist(&mut summary, &route).await;
        Ok(NoteResponse {
            summary_md: summary,
            route,
            raw_llm: output.raw,
            mode,
        })
    }

    /// Text to summarize and the mode it came from. Direct text wins over
    /// anything derived from the file.
    async fn input_text(&self, request: &NoteRequest) -> Result<(String, InputMode)> {
        let mut mode = request.mode;
        let mut input = None;

        if let Some(file) = &request.file {
            if mode.is_none() {
                mode = file
                    .content_type
                    .as_deref()
                    .and_then(InputMode::from_content_type);
            }
            input = Some(match mode {
                Some(InputMode::Image) => self.ocr.extract_text(&file.path).await?,
                Some(InputMode::Audio) => self.stt.transcribe(&file.path).await?,
                _ => file.file_name.clone(),
            });
        }

        if let Some(text) = request.text.as_ref().filter(|t| !t.is_empty()) {
            input = Some(text.clone());
        }

        match input.filter(|t| !t.is_empty()) {
            Some(text) => Ok((text, mode.unwrap_or(InputMode::Text))),
            None => Err(AgentError::InvalidInput("No input provided".into())),
        }
    }

    /// Write `summary` to `route`, appending a warning to it on failure.
    async fn persist(&self, summary: &mut String, route: &Route) {
        let result = match (route.notebook.as_deref(), route.section.as_deref()) {
            (Some(notebook), Some(section)) => self
                .store
                .create_entry(summary, notebook, section)
                .await
                .map(|_| ()),
            _ => Err(AgentError::DestinationNotFound(
                "no notebook and section available".into(),
            )),
        };

        if let Err(e) = result {
            tracing::warn!(store = self.store.name(), error = %e, "write failed");
            summary.push_str(&format!("\n\n> ⚠️ Failed to write to OneNote: {}", e));
        }
    }
}

impl fmt::Debug for NoteAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteAgent")
            .field("pipeline", &self.pipeline)
            .field("store", &self.store.name())
            .field("default_notebook", &self.default_notebook)
            .field("default_section", &self.default_section)
            .finish()
    }
}
