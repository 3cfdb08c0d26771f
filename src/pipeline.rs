//! The structured-output pipeline.
//!
//! Turns input text plus the current [`DestinationInventory`] into a
//! [`StructuredOutput`], calling the model at most twice:
//!
//! ```text
//! prompt ─► model ─► resp1 ─► extract ─┬─ found ─► validate ─┬─ ok ──────► output
//!                                      │                     └─ invalid ─► degraded(resp1)
//!                                      └─ none ─► retry prompt ─► model ─► resp2 ─► extract
//!                                                   ├─ found ─► validate ─┬─ ok ──────► output
//!                                                   │                     └─ invalid ─► degraded(resp2)
//!                                                   └─ none ─► degraded(resp1)
//! ```
//!
//! Only an extraction failure earns the retry. JSON of the wrong shape means
//! the model misread the contract, and re-prompting rarely fixes that.

use crate::{
    diagnostics::{Outcome, PipelineDiagnostics},
    error::Result,
    events::{emit, Event},
    invoker::ModelInvoker,
    output_parser::{extract_json_object, preview, validate, PREVIEW_CHARS},
    prompt,
    types::{DestinationInventory, StructuredOutput},
};
use std::sync::Arc;

const INVALID_SCHEMA_MARKER: &str = "(parsable but invalid schema)";
const INVALID_AFTER_RETRY_MARKER: &str = "(invalid schema after retry)";

/// Summarize-and-route pipeline with one bounded retry and graduated fallback.
///
/// Model-output problems never become errors; the only error this returns
/// is a transport failure on the first model call.
#[derive(Debug, Clone)]
pub struct StructuredPipeline {
    invoker: Arc<ModelInvoker>,
}

impl StructuredPipeline {
    pub fn new(invoker: Arc<ModelInvoker>) -> Self {
        Self { invoker }
    }

    /// The invoker this pipeline calls.
    pub fn invoker(&self) -> &ModelInvoker {
        &self.invoker
    }

    /// Run the pipeline and return only the output.
    pub async fn run(
        &self,
        input: &str,
        inventory: &DestinationInventory,
    ) -> Result<StructuredOutput> {
        self.run_with_diagnostics(input, inventory)
            .await
            .map(|(output, _)| output)
    }

    /// Run the pipeline, also reporting which path produced the output.
    pub async fn run_with_diagnostics(
        &self,
        input: &str,
        inventory: &DestinationInventory,
    ) -> Result<(StructuredOutput, PipelineDiagnostics)> {
        let events = &self.invoker.event_handler;
        emit(
            events,
            Event::PipelineStart {
                input_chars: input.chars().count(),
                notebooks: inventory.len(),
            },
        );

        let first_prompt = prompt::structured_prompt(input, inventory);
        let resp1 = self.invoker.invoke(&first_prompt).await?;
        self.record_call(1, &resp1);

        if let Some(json_text) = extract_json_object(&resp1) {
            let (output, diag) = match validate(json_text) {
                Ok(output) => (output, PipelineDiagnostics::new(Outcome::Parsed, 1)),
                Err(failure) => {
                    let mut diag = PipelineDiagnostics::new(Outcome::InvalidSchema, 1);
                    diag.validation_error = Some(failure.reason);
                    let summary = format!("{} {}", INVALID_SCHEMA_MARKER, preview(&resp1, PREVIEW_CHARS));
                    (StructuredOutput::degraded(summary, &resp1), diag)
                }
            };
            return Ok(self.finish(output, diag));
        }

        emit(events, Event::ExtractionFailed { attempt: 1 });
        emit(events, Event::RetryStart);
        tracing::info!("model response had no JSON object, retrying once");

        let resp2 = match self.invoker.invoke(&prompt::retry_prompt(&resp1)).await {
            Ok(text) => text,
            Err(e) => {
                // The first response is still worth showing.
                tracing::warn!(error = %e, "retry call failed, keeping first response");
                let output = StructuredOutput::degraded(preview(&resp1, PREVIEW_CHARS).to_string(), &resp1);
                return Ok(self.finish(output, PipelineDiagnostics::new(Outcome::Unparseable, 2)));
            }
        };
        self.record_call(2, &resp2);

        let (output, diag) = match extract_json_object(&resp2) {
            Some(json_text) => match validate(json_text) {
                Ok(output) => (output, PipelineDiagnostics::new(Outcome::ParsedAfterRetry, 2)),
                Err(failure) => {
                    let mut diag = PipelineDiagnostics::new(Outcome::InvalidSchemaAfterRetry, 2);
                    diag.validation_error = Some(failure.reason);
                    let summary =
                        format!("{} {}", INVALID_AFTER_RETRY_MARKER, preview(&resp2, PREVIEW_CHARS));
                    (StructuredOutput::degraded(summary, &resp2), diag)
                }
            },
            None => {
                emit(events, Event::ExtractionFailed { attempt: 2 });
                (
                    StructuredOutput::degraded(preview(&resp1, PREVIEW_CHARS).to_string(), &resp1),
                    PipelineDiagnostics::new(Outcome::Unparseable, 2),
                )
            }
        };

        Ok(self.finish(output, diag))
    }

    fn record_call(&self, attempt: u32, response: &str) {
        emit(
            &self.invoker.event_handler,
            Event::ModelCall {
                attempt,
                response_chars: response.chars().count(),
            },
        );
    }

    fn finish(
        &self,
        output: StructuredOutput,
        diag: PipelineDiagnostics,
    ) -> (StructuredOutput, PipelineDiagnostics) {
        let events = &self.invoker.event_handler;
        if diag.ok() {
            tracing::info!(outcome = ?diag.outcome, model_calls = diag.model_calls, "structured output parsed");
        } else {
            let reason = diag
                .validation_error
                .clone()
                .unwrap_or_else(|| "no JSON object in model output".to_string());
            tracing::warn!(outcome = ?diag.outcome, %reason, "returning degraded output");
            emit(events, Event::Degraded { reason });
        }
        emit(
            events,
            Event::PipelineEnd {
                outcome: diag.outcome,
                model_calls: diag.model_calls,
            },
        );
        (output, diag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::config::ModelConfig;
    use crate::error::AgentError;
    use crate::events::FnEventHandler;
    use crate::types::Route;
    use std::sync::Mutex;

    const VALID: &str = r#"{"summary_md": "- a\n- b\n- c", "route": {"notebook": "Work", "section": "Meetings"}}"#;

    fn inventory() -> DestinationInventory {
        DestinationInventory::new()
            .with("Work", ["Meetings", "Projects"])
            .with("Personal", ["Tasks"])
    }

    fn pipeline(mock: Arc<MockBackend>) -> StructuredPipeline {
        let invoker = ModelInvoker::builder(ModelConfig::default()).backend(mock).build();
        StructuredPipeline::new(Arc::new(invoker))
    }

    #[tokio::test]
    async fn test_valid_first_response() {
        let mock = Arc::new(MockBackend::fixed(format!("Sure, here you go:\n{}\nCheers", VALID)));
        let (out, diag) = pipeline(mock.clone())
            .run_with_diagnostics("notes", &inventory())
            .await
            .unwrap();
        assert_eq!(out.summary_md, "- a\n- b\n- c");
        assert_eq!(out.route, Route::new("Work", "Meetings"));
        assert_eq!(diag.outcome, Outcome::Parsed);
        assert_eq!(mock.calls(), 1);
        assert!(mock.prompts()[0].contains("notes"));
    }

    #[tokio::test]
    async fn test_invalid_schema_is_terminal() {
        let resp = r#"{"summary": "wrong key", "route": {}}"#;
        let mock = Arc::new(MockBackend::new(vec![resp.into(), VALID.into()]));
        let (out, diag) = pipeline(mock.clone())
            .run_with_diagnostics("notes", &inventory())
            .await
            .unwrap();
        assert_eq!(mock.calls(), 1);
        assert_eq!(diag.outcome, Outcome::InvalidSchema);
        assert!(diag.validation_error.is_some());
        assert_eq!(out.summary_md, format!("(parsable but invalid schema) {}", resp));
        assert_eq!(out.route, Route::empty());
        assert_eq!(out.raw.as_deref(), Some(resp));
    }

    #[tokio::test]
    async fn test_retry_after_extraction_failure() {
        let prose = "I think this belongs in Work / Meetings.";
        let mock = Arc::new(MockBackend::new(vec![prose.into(), VALID.into()]));
        let (out, diag) = pipeline(mock.clone())
            .run_with_diagnostics("notes", &inventory())
            .await
            .unwrap();
        assert_eq!(mock.calls(), 2);
        assert!(mock.prompts()[1].contains(prose));
        assert_eq!(diag.outcome, Outcome::ParsedAfterRetry);
        assert_eq!(out.route, Route::new("Work", "Meetings"));
    }

    #[tokio::test]
    async fn test_invalid_schema_after_retry() {
        let second = r#"{"summary_md": 7, "route": {}}"#;
        let mock = Arc::new(MockBackend::new(vec!["no json".into(), second.into()]));
        let (out, diag) = pipeline(mock)
            .run_with_diagnostics("notes", &inventory())
            .await
            .unwrap();
        assert_eq!(diag.outcome, Outcome::InvalidSchemaAfterRetry);
        assert_eq!(out.summary_md, format!("(invalid schema after retry) {}", second));
        assert_eq!(out.raw.as_deref(), Some(second));
        assert_eq!(out.route, Route::empty());
    }

    #[tokio::test]
    async fn test_terminal_failure_uses_first_response() {
        let first = "a".repeat(300);
        let mock = Arc::new(MockBackend::new(vec![first.clone(), "still no json {".into()]));
        let (out, diag) = pipeline(mock.clone())
            .run_with_diagnostics("notes", &inventory())
            .await
            .unwrap();
        assert_eq!(mock.calls(), 2);
        assert_eq!(diag.outcome, Outcome::Unparseable);
        assert_eq!(out.summary_md, "a".repeat(200));
        assert!(first.starts_with(&out.summary_md));
        assert_eq!(out.raw.as_deref(), Some(first.as_str()));
        assert_eq!(out.route, Route::empty());
    }

    #[tokio::test]
    async fn test_first_call_transport_failure_propagates() {
        let mock = Arc::new(MockBackend::failing("connection refused"));
        let err = pipeline(mock).run("notes", &inventory()).await.unwrap_err();
        assert!(matches!(err, AgentError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_retry_transport_failure_keeps_first_response() {
        let first = format!("prose only {}", "b".repeat(250));
        let mock = Arc::new(MockBackend::failing_after(vec![first.clone()], 1, "down"));
        let (out, diag) = pipeline(mock.clone())
            .run_with_diagnostics("notes", &inventory())
            .await
            .unwrap();
        assert_eq!(mock.calls(), 2);
        assert_eq!(diag.outcome, Outcome::Unparseable);
        assert_eq!(diag.model_calls, 2);
        assert_eq!(out.summary_md, preview(&first, PREVIEW_CHARS));
        assert_eq!(out.summary_md.chars().count(), 200);
        assert_eq!(out.raw.as_deref(), Some(first.as_str()));
        assert_eq!(out.route, Route::empty());
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let mock = Arc::new(MockBackend::fixed(VALID));
        let pipeline = pipeline(mock);
        let a = pipeline.run("same input", &inventory()).await.unwrap();
        let b = pipeline.run("same input", &inventory()).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_events_trace_retry_path() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = Arc::new(FnEventHandler(move |event: Event| {
            let name = match event {
                Event::PipelineStart { .. } => "start",
                Event::ModelCall { .. } => "call",
                Event::ExtractionFailed { .. } => "extract_failed",
                Event::RetryStart => "retry",
                Event::Degraded { .. } => "degraded",
                Event::PipelineEnd { .. } => "end",
            };
            sink.lock().unwrap().push(name.to_string());
        }));
        let invoker = ModelInvoker::builder(ModelConfig::default())
            .backend(Arc::new(MockBackend::new(vec!["prose".into(), VALID.into()])))
            .event_handler(handler)
            .build();

        StructuredPipeline::new(Arc::new(invoker))
            .run("notes", &inventory())
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["start", "call", "extract_failed", "retry", "call", "end"]
        );
    }
}
