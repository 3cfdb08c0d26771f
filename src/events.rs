//! Event system for pipeline lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe the structured-output
//! pipeline. Implement [`EventHandler`] to receive events for progress
//! tracking or metrics; everything also goes to `tracing`.

use crate::diagnostics::Outcome;
use std::sync::Arc;

/// Events emitted while turning input text into a structured output.
#[derive(Debug, Clone)]
pub enum Event {
    /// A pipeline invocation has started.
    PipelineStart {
        /// Length of the input text in characters.
        input_chars: usize,
        /// Number of notebooks offered to the model.
        notebooks: usize,
    },
    /// The model was called.
    ModelCall {
        /// 1 for the initial call, 2 for the retry.
        attempt: u32,
        /// Length of the returned text in characters.
        response_chars: usize,
    },
    /// No JSON object could be located in a model response.
    ExtractionFailed {
        /// Which call produced the response.
        attempt: u32,
    },
    /// The single corrective retry is starting.
    RetryStart,
    /// The pipeline is returning a degraded result.
    Degraded {
        /// Why the result is degraded.
        reason: String,
    },
    /// A pipeline invocation has finished.
    PipelineEnd {
        /// How the result was obtained.
        outcome: Outcome,
        /// Total number of model calls made.
        model_calls: u32,
    },
}

/// Handler for pipeline lifecycle events.
///
/// # Example
///
/// ```
/// use notebook_agent::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         if let Event::PipelineEnd { outcome, .. } = event {
///             println!("[end] {:?}", outcome);
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when the pipeline emits an event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
