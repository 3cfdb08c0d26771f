//! Prompt templates for summarizing and routing notes.

use crate::types::DestinationInventory;
use std::collections::HashMap;

const STRUCTURED_TEMPLATE: &str = r#"
You are an assistant that MUST produce a JSON object following this schema exactly:

{{
  "summary_md": "<string: a short markdown summary (bulleted list) of the note>",
  "route": {{
    "notebook": "<string: choose EXACTLY one notebook name from the available options>",
    "section": "<string: choose EXACTLY one section name that exists inside the chosen notebook>"
  }},
  "raw": "<optional: you may include the original text or extra debug info>"
}}

Available notebooks & sections:
{options}

Now analyze the following note/transcript/text and produce the JSON ONLY (no extra commentary):

--- NOTE START ---
{input}
--- NOTE END ---

Make sure:
- `notebook` and `section` are exact matches to the listed options (case-sensitive is OK but prefer exact words).
- `summary_md` is 3-7 concise bullets in markdown (each bullet prefixed with '-' or '*').
- Output valid JSON only.
"#;

const RETRY_TEMPLATE: &str = "Your previous output was not valid JSON. Please respond with JSON only \
using the schema described previously. Here is the original output:\n\n{previous}\n\nNow output JSON only.";

const SUMMARY_TEMPLATE: &str = "Summarize into 4-6 bullet points (markdown):\n\n{input}";

/// Build a prompt string with variable substitution.
///
/// Replaces `{key}` placeholders with values from `vars` in a single pass,
/// so substituted text is never scanned again: a note that happens to
/// contain `{options}` stays verbatim. Unknown placeholders are left as-is.
///
/// Use `{{` to insert a literal `{` and `}}` to insert a literal `}`.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use notebook_agent::prompt::render;
///
/// let vars = HashMap::from([("name".to_string(), "Alice".to_string())]);
/// let result = render("Hello {name}, here is JSON: {{\"key\": \"val\"}}", &vars);
/// assert_eq!(result, r#"Hello Alice, here is JSON: {"key": "val"}"#);
/// ```
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('{') {
            if let Some(end) = tail.find('}') {
                let key = &tail[1..end];
                if let Some(value) = vars.get(key) {
                    out.push_str(value);
                    rest = &tail[end + 1..];
                    continue;
                }
            }
        }

        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    out.push_str(rest);
    out
}

/// One line per notebook listing its sections, or a note that none exist.
pub fn destination_options(inventory: &DestinationInventory) -> String {
    if inventory.is_empty() {
        return "No notebooks found.".to_string();
    }
    inventory
        .iter()
        .map(|nb| {
            let sections = nb
                .sections
                .iter()
                .map(|s| format!("\"{}\"", s))
                .collect::<Vec<_>>()
                .join(", ");
            format!("- Notebook \"{}\" with sections: {}", nb.name, sections)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking for the JSON object: summary plus a route chosen from `inventory`.
pub fn structured_prompt(input: &str, inventory: &DestinationInventory) -> String {
    let vars = HashMap::from([
        ("options".to_string(), destination_options(inventory)),
        ("input".to_string(), input.to_string()),
    ]);
    render(STRUCTURED_TEMPLATE, &vars)
}

/// Corrective prompt after a response with no JSON in it.
pub fn retry_prompt(previous: &str) -> String {
    let vars = HashMap::from([("previous".to_string(), previous.to_string())]);
    render(RETRY_TEMPLATE, &vars)
}

/// Plain summarization prompt used when the caller already chose a destination.
pub fn summary_prompt(input: &str) -> String {
    let vars = HashMap::from([("input".to_string(), input.to_string())]);
    render(SUMMARY_TEMPLATE, &vars)
}
