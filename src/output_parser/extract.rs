//! Locating a JSON object inside free-form model text.
//!
//! Models wrap their JSON in prose ("Sure! Here is the result: ... Hope that
//! helps"), and that prose may itself contain braces. Slicing from the first
//! `{` to the last `}` would then return garbage, so the extractor walks the
//! text once, tracking brace depth and string-literal state.

/// Extract the first balanced top-level `{...}` object from `text`.
///
/// Scanning starts at the first `{`. Braces inside string literals do not
/// count; a `"` closes a string only when it is preceded by an even number
/// of backslashes. Returns `None` when there is no `{` or when depth never
/// returns to zero.
///
/// # Examples
///
/// ```
/// use notebook_agent::output_parser::extract_json_object;
///
/// let input = r#"Result: {"summary_md": "note: {not json}"} done"#;
/// assert_eq!(
///     extract_json_object(input),
///     Some(r#"{"summary_md": "note: {not json}"}"#)
/// );
/// assert_eq!(extract_json_object("no json {"), None);
/// ```
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    // Only ASCII bytes are inspected, so every index is a char boundary.
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if *byte == b'\\' {
                escape_next = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}
