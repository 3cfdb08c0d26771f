//! # Notebook Agent
//!
//! Summarize notes, screenshots or recordings with a local LLM and file the
//! summary into the right OneNote notebook and section.
//!
//! The core is a structured-output pipeline that never lets model
//! formatting noise cost the user their summary:
//!
//! - **[`StructuredPipeline`]** asks the model for one JSON object holding a
//!   markdown summary and a destination chosen from the live inventory,
//!   retries once when no JSON comes back, and otherwise degrades to a
//!   best-effort summary.
//! - **[`output_parser`]** finds the JSON object inside chatty model output
//!   and checks it against the schema without coercing anything.
//! - **[`resolve`]** turns the model's suggestion into a destination that
//!   actually exists, falling back to configured defaults and then to the
//!   first notebook.
//! - **[`NoteAgent`]** ties it together with OCR, speech-to-text and the
//!   notebook store; [`server`] exposes it over HTTP.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use notebook_agent::{DestinationInventory, ModelConfig, ModelInvoker, StructuredPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let invoker = ModelInvoker::builder(ModelConfig::from_env()).build();
//!     let pipeline = StructuredPipeline::new(Arc::new(invoker));
//!
//!     let inventory = DestinationInventory::new()
//!         .with("Work", ["Meetings", "Projects"])
//!         .with("Personal", ["Tasks"]);
//!
//!     let output = pipeline.run("Kickoff went well; ship beta by Friday.", &inventory).await?;
//!     println!("{}\n-> {:?}", output.summary_md, output.route);
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without a model
//!
//! ```
//! use std::sync::Arc;
//! use notebook_agent::{DestinationInventory, MockBackend, ModelConfig, ModelInvoker, Route, StructuredPipeline};
//!
//! # tokio_test::block_on(async {
//! let mock = Arc::new(MockBackend::fixed(
//!     r#"{"summary_md": "- shipped", "route": {"notebook": "Work", "section": "Projects"}}"#,
//! ));
//! let invoker = ModelInvoker::builder(ModelConfig::default()).backend(mock).build();
//! let inventory = DestinationInventory::new().with("Work", ["Projects"]);
//!
//! let output = StructuredPipeline::new(Arc::new(invoker)).run("notes", &inventory).await.unwrap();
//! assert_eq!(output.route, Route::new("Work", "Projects"));
//! # });
//! ```

pub mod agent;
pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod invoker;
pub mod media;
pub mod output_parser;
pub mod pipeline;
pub mod prompt;
pub mod resolver;
pub mod server;
pub mod store;
pub mod types;

pub use agent::{InputMode, NoteAgent, NoteRequest, NoteResponse, UploadedFile};
pub use backend::{Backend, MockBackend, OllamaBackend};
pub use config::{AppConfig, GraphConfig, MediaConfig, ModelConfig};
pub use diagnostics::{Outcome, PipelineDiagnostics};
pub use error::{AgentError, Result};
pub use events::{Event, EventHandler, FnEventHandler};
pub use invoker::{ModelInvoker, ModelInvokerBuilder};
pub use pipeline::StructuredPipeline;
pub use resolver::resolve;
pub use store::{DestinationStore, GraphStore, MemoryStore, PageReceipt};
pub use types::{DestinationInventory, Notebook, Route, StructuredOutput};
