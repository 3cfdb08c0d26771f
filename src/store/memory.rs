//! In-memory store for tests and local runs without a Graph account.

use super::{DestinationStore, PageReceipt};
use crate::error::{AgentError, Result};
use crate::types::DestinationInventory;
use async_trait::async_trait;
use std::sync::Mutex;

/// A page written to a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub notebook: String,
    pub section: String,
    pub content: String,
}

/// [`DestinationStore`] over a fixed inventory that records every write.
///
/// # Example
///
/// ```
/// use notebook_agent::store::MemoryStore;
/// use notebook_agent::DestinationInventory;
///
/// let store = MemoryStore::new(DestinationInventory::new().with("Work", ["Meetings"]));
/// assert!(store.pages().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inventory: DestinationInventory,
    pages: Mutex<Vec<StoredPage>>,
    write_failure: Option<String>,
}

impl MemoryStore {
    pub fn new(inventory: DestinationInventory) -> Self {
        Self {
            inventory,
            ..Self::default()
        }
    }

    /// Make every `create_entry` fail with a remote error carrying `message`.
    pub fn failing_writes(mut self, message: impl Into<String>) -> Self {
        self.write_failure = Some(message.into());
        self
    }

    /// Pages written so far, in order.
    pub fn pages(&self) -> Vec<StoredPage> {
        self.pages.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DestinationStore for MemoryStore {
    async fn list_destinations(&self) -> Result<DestinationInventory> {
        Ok(self.inventory.clone())
    }

    async fn create_entry(&self, content: &str, notebook: &str, section: &str) -> Result<PageReceipt> {
        if let Some(message) = &self.write_failure {
            return Err(AgentError::RemoteError {
                status: 500,
                body: message.clone(),
            });
        }
        if self.inventory.sections(notebook).is_none() {
            return Err(AgentError::DestinationNotFound(format!("Notebook '{}' not found", notebook)));
        }
        if !self.inventory.contains(notebook, section) {
            return Err(AgentError::DestinationNotFound(format!(
                "Section '{}' not found in notebook '{}'",
                section, notebook
            )));
        }

        let mut pages = self
            .pages
            .lock()
            .map_err(|_| AgentError::Other("memory store lock poisoned".into()))?;
        pages.push(StoredPage {
            notebook: notebook.to_string(),
            section: section.to_string(),
            content: content.to_string(),
        });
        Ok(PageReceipt {
            id: format!("page-{}", pages.len()),
            web_url: None,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
