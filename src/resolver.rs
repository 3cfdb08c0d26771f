//! Destination resolution: pick the notebook/section pair to write to.

use crate::types::{DestinationInventory, Route};

/// Decide the final destination for `candidate`.
///
/// In order:
/// 1. the candidate, if its notebook exists and lists its section;
/// 2. the configured default pair, if both are set and exist together;
/// 3. the first notebook and its first section (section absent if it has none);
/// 4. an empty route when the inventory is empty.
///
/// A valid notebook with an unknown section is not a partial match; it falls
/// through like any other invalid candidate.
///
/// # Example
///
/// ```
/// use notebook_agent::{resolve, DestinationInventory, Route};
///
/// let inv = DestinationInventory::new()
///     .with("Work", ["Meetings", "Projects"])
///     .with("Personal", ["Tasks"]);
///
/// let route = resolve(&Route::new("Work", "Nonexistent"), &inv, None, None);
/// assert_eq!(route, Route::new("Work", "Meetings"));
/// ```
pub fn resolve(
    candidate: &Route,
    inventory: &DestinationInventory,
    default_notebook: Option<&str>,
    default_section: Option<&str>,
) -> Route {
    if let (Some(nb), Some(sec)) = (candidate.notebook.as_deref(), candidate.section.as_deref()) {
        if inventory.contains(nb, sec) {
            return candidate.clone();
        }
    }

    if let (Some(nb), Some(sec)) = (default_notebook, default_section) {
        if inventory.contains(nb, sec) {
            tracing::debug!(notebook = nb, section = sec, "using configured default destination");
            return Route::new(nb, sec);
        }
    }

    match inventory.first() {
        Some(first) => {
            tracing::debug!(notebook = %first.name, "falling back to first notebook");
            Route {
                notebook: Some(first.name.clone()),
                section: first.sections.first().cloned(),
            }
        }
        None => Route::empty(),
    }
}
