//! # LLM Output Parser
//!
//! Turns free-form model text into a validated
//! [`StructuredOutput`](crate::types::StructuredOutput) in two steps:
//!
//! | Step | Function | Failure |
//! |------|----------|---------|
//! | Extraction | [`extract_json_object`] | `None`: no balanced object in the text |
//! | Validation | [`validate`] | [`ValidationFailure`]: JSON of the wrong shape |
//!
//! The [`StructuredPipeline`](crate::pipeline::StructuredPipeline) treats the
//! two failures differently: only an extraction failure earns a retry.

pub mod error;
pub mod extract;
pub mod schema;

pub use error::{preview, ValidationFailure, PREVIEW_CHARS};
pub use extract::extract_json_object;
pub use schema::validate;
