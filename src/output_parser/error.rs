//! Error type for schema validation of model output.

/// Maximum number of characters kept from model text for diagnostics.
pub const PREVIEW_CHARS: usize = 200;

/// JSON was found but did not match the output schema.
///
/// Carries a bounded preview of the offending text, never the full text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid schema: {reason} (text: {preview})")]
pub struct ValidationFailure {
    /// What was wrong (parse error, missing field, wrong type).
    pub reason: String,
    /// The first [`PREVIEW_CHARS`] characters of the rejected text.
    pub preview: String,
}

impl ValidationFailure {
    pub(crate) fn new(reason: impl Into<String>, text: &str) -> Self {
        Self {
            reason: reason.into(),
            preview: preview(text, PREVIEW_CHARS).to_string(),
        }
    }
}

/// The first `max_chars` characters of `s`, cut on a character boundary.
pub fn preview(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
