//! HTTP surface.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /chat` | multipart form: `text`, `file`, `mode`, `target_notebook`, `target_section` |
//! | `GET /notebooks` | `[{"notebook": ..., "sections": [...]}]` |
//! | `GET /` | liveness banner |
//! | `GET /health` | `{"ok": true}` |

use crate::agent::{InputMode, NoteAgent, NoteRequest, NoteResponse, UploadedFile};
use crate::config::AppConfig;
use crate::error::{AgentError, Result};
use crate::types::DestinationInventory;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Largest accepted request body (audio uploads are the big ones).
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub agent: NoteAgent,
}

/// Build the router with CORS limited to `cors_origins`.
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/notebooks", get(notebooks))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({"status": "ok", "msg": "Backend running"}))
}

async fn health() -> Json<Value> {
    Json(json!({"ok": true}))
}

async fn notebooks(State(state): State<Arc<AppState>>) -> Result<Json<DestinationInventory>> {
    Ok(Json(state.agent.destinations().await?))
}

async fn chat(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Json<NoteResponse>> {
    let form = ChatForm::read(multipart).await?;
    let request = NoteRequest {
        text: form.text,
        file: form.upload.as_ref().map(TempUpload::as_uploaded_file),
        mode: form.mode.as_deref().map(str::parse::<InputMode>).transpose()?,
        target_notebook: form.target_notebook,
        target_section: form.target_section,
    };
    let response = state.agent.handle(request).await?;
    // `form.upload` is dropped here, removing the temporary file.
    Ok(Json(response))
}

/// Fields of the `/chat` form. Empty text fields count as absent.
#[derive(Debug, Default)]
struct ChatForm {
    text: Option<String>,
    mode: Option<String>,
    target_notebook: Option<String>,
    target_section: Option<String>,
    upload: Option<TempUpload>,
}

impl ChatForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = ChatForm::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_form)?;
                // Browsers send an empty, unnamed part when no file was picked.
                if bytes.is_empty() && file_name.is_empty() {
                    continue;
                }
                form.upload = Some(TempUpload::write(&file_name, content_type, &bytes).await?);
                continue;
            }

            let value = field.text().await.map_err(bad_form)?;
            let value = Some(value).filter(|v| !v.is_empty());
            match name.as_str() {
                "text" => form.text = value,
                "mode" => form.mode = value,
                "target_notebook" => form.target_notebook = value,
                "target_section" => form.target_section = value,
                other => tracing::debug!(field = other, "ignoring unknown form field"),
            }
        }

        Ok(form)
    }
}

fn bad_form(e: axum::extract::multipart::MultipartError) -> AgentError {
    AgentError::InvalidInput(format!("Invalid form data: {}", e))
}

/// An upload saved under the system temp directory, removed on drop.
#[derive(Debug)]
struct TempUpload {
    path: PathBuf,
    file_name: String,
    content_type: Option<String>,
}

impl TempUpload {
    async fn write(file_name: &str, content_type: Option<String>, bytes: &[u8]) -> Result<Self> {
        // Only the final component; client-supplied names may contain paths.
        let file_name = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let path = std::env::temp_dir().join(format!(
            "upload_{}_{}",
            uuid::Uuid::new_v4().simple(),
            file_name
        ));
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "saved upload");
        Ok(Self {
            path,
            file_name,
            content_type,
        })
    }

    fn as_uploaded_file(&self) -> UploadedFile {
        UploadedFile {
            path: self.path.clone(),
            content_type: self.content_type.clone(),
            file_name: self.file_name.clone(),
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "could not remove upload");
        }
    }
}

/// Bind `config.host:config.port` and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: &AppConfig, agent: NoteAgent) -> Result<()> {
    let state = Arc::new(AppState { agent });
    let router = create_router(state, &config.cors_origins);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received terminate signal, shutting down"),
    }
}
