//! Validation of extracted JSON against the structured-output schema.
//!
//! ```text
//! {
//!   "summary_md": string,                          required
//!   "route": { "notebook": string|null|absent,     required object
//!              "section":  string|null|absent },
//!   "raw": string|null|absent
//! }
//! ```
//!
//! Wrong types are rejected, never coerced: a numeric summary or a route
//! given as an array is a [`ValidationFailure`].

use serde_json::{Map, Value};

use crate::output_parser::error::ValidationFailure;
use crate::types::{Route, StructuredOutput};

/// Validate `json_text` and build a [`StructuredOutput`] from it.
///
/// Keys other than the ones above are ignored, including extra keys inside
/// `route`.
pub fn validate(json_text: &str) -> Result<StructuredOutput, ValidationFailure> {
    let value: Value = serde_json::from_str(json_text)
        .map_err(|e| ValidationFailure::new(format!("not valid JSON: {}", e), json_text))?;

    let obj = value
        .as_object()
        .ok_or_else(|| ValidationFailure::new("top-level value is not an object", json_text))?;

    let summary_md = match obj.get("summary_md") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ValidationFailure::new("'summary_md' is not a string", json_text)),
        None => return Err(ValidationFailure::new("missing required key 'summary_md'", json_text)),
    };

    let route = match obj.get("route") {
        Some(Value::Object(route)) => Route {
            notebook: optional_string(route, "notebook")
                .map_err(|reason| ValidationFailure::new(reason, json_text))?,
            section: optional_string(route, "section")
                .map_err(|reason| ValidationFailure::new(reason, json_text))?,
        },
        Some(_) => return Err(ValidationFailure::new("'route' is not an object", json_text)),
        None => return Err(ValidationFailure::new("missing required key 'route'", json_text)),
    };

    let raw = optional_string(obj, "raw").map_err(|reason| ValidationFailure::new(reason, json_text))?;

    Ok(StructuredOutput {
        summary_md,
        route,
        raw,
    })
}

/// A key that may be absent or null, but must be a string otherwise.
fn optional_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(format!("'{}' is not a string", key)),
    }
}
