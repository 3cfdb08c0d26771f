//! Destination store: where summaries are listed and written.
//!
//! ```text
//! NoteAgent ──► DestinationStore::list_destinations() ──► DestinationInventory
//!           └─► DestinationStore::create_entry()      ──► PageReceipt
//!                          │
//!              ┌───────────┴───────────┐
//!          GraphStore              MemoryStore
//!              │
//!        TokenProvider (DeviceCodeAuth | StaticToken)
//! ```
//!
//! Both calls are single attempts. A failed write is reported to the caller,
//! who decides how to surface it.

pub mod auth;
pub mod graph;
pub mod memory;

pub use auth::{DeviceCodeAuth, StaticToken, TokenProvider};
pub use graph::GraphStore;
pub use memory::{MemoryStore, StoredPage};

use crate::error::Result;
use crate::types::DestinationInventory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identifies a page created by [`DestinationStore::create_entry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageReceipt {
    pub id: String,
    /// Browser link to the page, when the store reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

/// Remote notebook store.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Every notebook with its sections, in store order.
    async fn list_destinations(&self) -> Result<DestinationInventory>;

    /// Write `content` as a new page in `notebook` / `section`.
    ///
    /// Names that do not exist yield
    /// [`AgentError::DestinationNotFound`](crate::AgentError::DestinationNotFound).
    async fn create_entry(&self, content: &str, notebook: &str, section: &str) -> Result<PageReceipt>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
