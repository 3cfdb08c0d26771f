//! What happened during one pipeline invocation.
//!
//! [`PipelineDiagnostics`] records which path produced the
//! [`StructuredOutput`](crate::types::StructuredOutput) and how many model
//! calls it took.

use serde::Serialize;

/// How the structured output was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// First response extracted and validated.
    Parsed,
    /// First response had no JSON; the retry response validated.
    ParsedAfterRetry,
    /// First response had JSON of the wrong shape; degraded, no retry.
    InvalidSchema,
    /// Retry response had JSON of the wrong shape; degraded.
    InvalidSchemaAfterRetry,
    /// Neither response had JSON; degraded to the first response's text.
    Unparseable,
}

impl Outcome {
    /// Whether the output came from a validated model object.
    pub fn is_structured(self) -> bool {
        matches!(self, Outcome::Parsed | Outcome::ParsedAfterRetry)
    }
}

/// Records what happened during one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineDiagnostics {
    pub outcome: Outcome,

    /// Number of model calls (1 or 2).
    pub model_calls: u32,

    /// Validation error message, when the outcome is an invalid schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

impl PipelineDiagnostics {
    pub(crate) fn new(outcome: Outcome, model_calls: u32) -> Self {
        Self {
            outcome,
            model_calls,
            validation_error: None,
        }
    }

    /// Quick check: did the model produce a valid object?
    pub fn ok(&self) -> bool {
        self.outcome.is_structured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_outcomes_are_ok() {
        assert!(PipelineDiagnostics::new(Outcome::Parsed, 1).ok());
        assert!(PipelineDiagnostics::new(Outcome::ParsedAfterRetry, 2).ok());
        assert!(!PipelineDiagnostics::new(Outcome::InvalidSchema, 1).ok());
        assert!(!PipelineDiagnostics::new(Outcome::Unparseable, 2).ok());
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_value(Outcome::InvalidSchemaAfterRetry).unwrap();
        assert_eq!(json, "invalid_schema_after_retry");
    }
}
