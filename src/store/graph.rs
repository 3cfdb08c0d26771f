//! OneNote over Microsoft Graph.

use super::{DestinationStore, PageReceipt, TokenProvider};
use crate::error::{AgentError, Result};
use crate::types::DestinationInventory;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Production Graph endpoint.
pub const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    value: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    id: String,
    #[serde(rename = "displayName")]
    display_name: String,
}

/// [`DestinationStore`] backed by the OneNote Graph API.
#[derive(Clone)]
pub struct GraphStore {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl GraphStore {
    pub fn new(client: Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            base_url: GRAPH_BASE.to_string(),
            tokens,
        }
    }

    /// Point the store at another Graph-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(builder.bearer_auth(token))
    }

    async fn list(&self, path: &str, operation: &'static str) -> Result<Vec<Entity>> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.authorized(self.client.get(&url)).await?.send().await?;
        let listing: Listing = check_status(resp, operation).await?.json().await?;
        Ok(listing.value)
    }

    async fn notebooks(&self) -> Result<Vec<Entity>> {
        self.list("/me/onenote/notebooks", "listing notebooks").await
    }

    async fn sections(&self, notebook_id: &str) -> Result<Vec<Entity>> {
        self.list(
            &format!("/me/onenote/notebooks/{}/sections", notebook_id),
            "listing sections",
        )
        .await
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl DestinationStore for GraphStore {
    async fn list_destinations(&self) -> Result<DestinationInventory> {
        let mut inventory = DestinationInventory::new();
        for nb in self.notebooks().await? {
            let sections = self.sections(&nb.id).await?;
            inventory.insert(nb.display_name, sections.into_iter().map(|s| s.display_name));
        }
        tracing::debug!(notebooks = inventory.len(), "fetched destination inventory");
        Ok(inventory)
    }

    async fn create_entry(&self, content: &str, notebook: &str, section: &str) -> Result<PageReceipt> {
        let nb = self
            .notebooks()
            .await?
            .into_iter()
            .find(|nb| nb.display_name == notebook)
            .ok_or_else(|| AgentError::DestinationNotFound(format!("Notebook '{}' not found", notebook)))?;

        let sec = self
            .sections(&nb.id)
            .await?
            .into_iter()
            .find(|s| s.display_name == section)
            .ok_or_else(|| {
                AgentError::DestinationNotFound(format!(
                    "Section '{}' not found in notebook '{}'",
                    section, notebook
                ))
            })?;

        let url = format!("{}/me/onenote/sections/{}/pages", self.base_url, sec.id);
        let title = format!("AI Summary - {}", chrono::Local::now().format("%Y-%m-%d %H:%M"));
        let html = page_html(&title, content);

        let resp = self
            .authorized(self.client.post(&url))
            .await?
            .header(reqwest::header::CONTENT_TYPE, "text/html")
            .body(html)
            .send()
            .await?;
        let created: Value = check_status(resp, "creating page").await?.json().await?;

        let receipt = PageReceipt {
            id: created["id"].as_str().unwrap_or_default().to_string(),
            web_url: created
                .pointer("/links/oneNoteWebUrl/href")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        tracing::info!(notebook, section, page_id = %receipt.id, "created page");
        Ok(receipt)
    }

    fn name(&self) -> &'static str {
        "onenote"
    }
}

async fn check_status(resp: Response, operation: &'static str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(AgentError::Unauthorized { operation, body });
    }
    Err(AgentError::RemoteError {
        status: status.as_u16(),
        body,
    })
}

/// Minimal page document: escaped content with newlines as `<br>`.
fn page_html(title: &str, content: &str) -> String {
    let body = escape_html(content).replace('\n', "<br>");
    format!(
        "<!DOCTYPE html>\n<html><head><title>{}</title></head><body><div>{}</div></body></html>",
        escape_html(title),
        body
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
