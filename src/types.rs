use serde::{Deserialize, Serialize};

/// Candidate (or resolved) destination inside the notebook store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Notebook display name.
    #[serde(default)]
    pub notebook: Option<String>,

    /// Section display name inside `notebook`.
    #[serde(default)]
    pub section: Option<String>,
}

impl Route {
    pub fn new(notebook: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            notebook: Some(notebook.into()),
            section: Some(section.into()),
        }
    }

    /// A route with neither field set.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Schema-conforming result of one pipeline invocation.
///
/// Built once and never mutated afterwards; `summary_md` is always present,
/// even on degraded paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredOutput {
    /// Markdown bullet list summarizing the input.
    pub summary_md: String,

    /// Destination suggested by the model.
    pub route: Route,

    /// Raw model text or extra debug info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl StructuredOutput {
    /// A degraded result: the given summary, no route, the raw model text.
    pub fn degraded(summary_md: String, raw: &str) -> Self {
        Self {
            summary_md,
            route: Route::empty(),
            raw: Some(raw.to_string()),
        }
    }
}

/// One notebook and its sections, in store order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    #[serde(rename = "notebook")]
    pub name: String,
    pub sections: Vec<String>,
}

/// Ordered mapping of notebook names to their section names.
///
/// Fetched fresh on every request; notebook names are unique and keep the
/// order in which the store listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationInventory {
    notebooks: Vec<Notebook>,
}

impl DestinationInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a notebook, replacing the sections of an existing one with the same name.
    pub fn insert<I, S>(&mut self, notebook: impl Into<String>, sections: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = notebook.into();
        let sections: Vec<String> = sections.into_iter().map(Into::into).collect();
        match self.notebooks.iter_mut().find(|nb| nb.name == name) {
            Some(existing) => existing.sections = sections,
            None => self.notebooks.push(Notebook { name, sections }),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<I, S>(mut self, notebook: impl Into<String>, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(notebook, sections);
        self
    }

    /// Sections of `notebook`, if it exists.
    pub fn sections(&self, notebook: &str) -> Option<&[String]> {
        self.notebooks
            .iter()
            .find(|nb| nb.name == notebook)
            .map(|nb| nb.sections.as_slice())
    }

    /// Whether `section` exists inside `notebook`.
    pub fn contains(&self, notebook: &str, section: &str) -> bool {
        self.sections(notebook)
            .is_some_and(|secs| secs.iter().any(|s| s == section))
    }

    /// First notebook by insertion order.
    pub fn first(&self) -> Option<&Notebook> {
        self.notebooks.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notebook> {
        self.notebooks.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.notebooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notebooks.len()
    }
}
