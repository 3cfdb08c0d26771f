//! Process configuration, resolved once at startup from the environment.
//!
//! Every `from_env` constructor has a `from_source` twin that takes a lookup
//! function, so tests never touch the real process environment.

use crate::error::{AgentError, Result};
use serde_json::{json, Value};
use std::time::Duration;

/// Configuration for the language-model backend.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model identifier (e.g. `"mistral"`).
    pub model: String,

    /// Base URL of the Ollama server.
    pub base_url: String,

    /// Run on CPU only (`num_gpu = 0`).
    pub force_cpu: bool,

    /// Limit the number of layers offloaded to the GPU.
    pub num_gpu_layers: Option<u32>,

    /// Sampling temperature; the server default applies when `None`.
    pub temperature: Option<f64>,

    /// Request timeout for a single model call.
    pub timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "mistral".to_string(),
            base_url: "http://localhost:11434".to_string(),
            force_cpu: false,
            num_gpu_layers: None,
            temperature: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl ModelConfig {
    pub fn from_env() -> Self {
        Self::from_source(|key| std::env::var(key).ok())
    }

    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            model: get("OLLAMA_MODEL").unwrap_or(defaults.model),
            base_url: get("OLLAMA_BASE_URL").unwrap_or(defaults.base_url),
            force_cpu: get("OLLAMA_FORCE_CPU").is_some_and(|v| truthy(&v)),
            num_gpu_layers: get("OLLAMA_NUM_GPU_LAYERS")
                .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
                .and_then(|v| v.parse().ok()),
            temperature: get("OLLAMA_TEMPERATURE").and_then(|v| v.trim().parse().ok()),
            timeout: get("OLLAMA_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_force_cpu(mut self, enabled: bool) -> Self {
        self.force_cpu = enabled;
        self
    }

    pub fn with_gpu_layers(mut self, layers: u32) -> Self {
        self.num_gpu_layers = Some(layers);
        self
    }

    /// Build the Ollama `options` object.
    ///
    /// Forcing the CPU wins over a GPU layer limit.
    pub fn options(&self) -> Value {
        let mut opts = json!({});
        if self.force_cpu {
            opts["num_gpu"] = json!(0);
        } else if let Some(layers) = self.num_gpu_layers {
            opts["num_gpu"] = json!(layers);
        }
        if let Some(temp) = self.temperature {
            opts["temperature"] = json!(temp);
        }
        opts
    }
}

/// OAuth settings for the Microsoft Graph notebook API.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Public client id registered for the device-code flow.
    pub client_id: Option<String>,
    pub tenant_id: String,
    /// Fully qualified scopes, reserved OIDC scopes removed.
    pub scopes: Vec<String>,
    /// Pre-issued token; bypasses the device flow when set.
    pub access_token: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            tenant_id: "common".to_string(),
            scopes: normalize_scopes(DEFAULT_GRAPH_SCOPES),
            access_token: None,
        }
    }
}

const DEFAULT_GRAPH_SCOPES: &str = "User.Read Notes.ReadWrite";
const RESERVED_SCOPES: [&str; 3] = ["offline_access", "openid", "profile"];
const GRAPH_RESOURCE: &str = "https://graph.microsoft.com";

impl GraphConfig {
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            client_id: get("CLIENT_ID").filter(|v| !v.is_empty()),
            tenant_id: get("TENANT_ID").unwrap_or_else(|| "common".to_string()),
            scopes: normalize_scopes(
                &get("GRAPH_SCOPES").unwrap_or_else(|| DEFAULT_GRAPH_SCOPES.to_string()),
            ),
            access_token: get("GRAPH_ACCESS_TOKEN").filter(|v| !v.is_empty()),
        }
    }

    /// Authority URL for the configured tenant.
    pub fn authority(&self) -> String {
        format!("https://login.microsoftonline.com/{}", self.tenant_id)
    }
}

/// Split a space- or comma-separated scope list, drop reserved scopes and
/// prefix bare scope names with the Graph resource.
pub fn normalize_scopes(raw: &str) -> Vec<String> {
    raw.split(',')
        .flat_map(str::split_whitespace)
        .filter(|s| !RESERVED_SCOPES.contains(s))
        .map(|s| {
            if s.to_ascii_lowercase().starts_with("http") {
                s.to_string()
            } else {
                format!("{}/{}", GRAPH_RESOURCE, s)
            }
        })
        .collect()
}

/// OCR and speech-to-text settings.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub tesseract_path: String,
    pub whisper_url: String,
    pub whisper_model: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            tesseract_path: "tesseract".to_string(),
            whisper_url: "http://localhost:8000/v1/audio/transcriptions".to_string(),
            whisper_model: "medium".to_string(),
        }
    }
}

impl MediaConfig {
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            tesseract_path: get("TESSERACT_PATH").unwrap_or(defaults.tesseract_path),
            whisper_url: get("WHISPER_URL").unwrap_or(defaults.whisper_url),
            whisper_model: get("WHISPER_MODEL").unwrap_or(defaults.whisper_model),
        }
    }
}

/// Everything the binary needs, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub graph: GraphConfig,
    pub media: MediaConfig,
    pub default_notebook: Option<String>,
    pub default_section: Option<String>,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Timeout for Graph, sign-in and transcription requests.
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match get("PORT") {
            Some(p) => p
                .trim()
                .parse()
                .map_err(|_| AgentError::InvalidConfig(format!("PORT is not a port: {}", p)))?,
            None => 8000,
        };

        let mut cors_origins: Vec<String> = get("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if cors_origins.is_empty() {
            cors_origins = vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ];
        }

        Ok(Self {
            model: ModelConfig::from_source(&get),
            graph: GraphConfig::from_source(&get),
            media: MediaConfig::from_source(&get),
            default_notebook: get("DEFAULT_NOTEBOOK").filter(|v| !v.is_empty()),
            default_section: get("DEFAULT_SECTION").filter(|v| !v.is_empty()),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            cors_origins,
            http_timeout: get("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(120)),
        })
    }

    /// Shared client for every remote call except the model.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| AgentError::InvalidConfig(format!("cannot build HTTP client: {}", e)))
    }
}

fn truthy(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_model_config_defaults() {
        let config = ModelConfig::from_source(source(&[]));
        assert_eq!(config.model, "mistral");
        assert_eq!(config.base_url, "http://localhost:11434");
        assert!(!config.force_cpu);
        assert!(config.num_gpu_layers.is_none());
        assert!(config.temperature.is_none());
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.options(), json!({}));
    }

    #[test]
    fn test_model_config_from_env_values() {
        let config = ModelConfig::from_source(source(&[
            ("OLLAMA_MODEL", "llama3.2"),
            ("OLLAMA_FORCE_CPU", "Yes"),
            ("OLLAMA_NUM_GPU_LAYERS", "12"),
            ("OLLAMA_TEMPERATURE", "0.2"),
        ]));
        assert_eq!(config.model, "llama3.2");
        assert!(config.force_cpu);
        assert_eq!(config.num_gpu_layers, Some(12));
        assert_eq!(config.temperature, Some(0.2));
    }

    #[test]
    fn test_gpu_layers_must_be_digits() {
        let config = ModelConfig::from_source(source(&[("OLLAMA_NUM_GPU_LAYERS", "-3")]));
        assert!(config.num_gpu_layers.is_none());
    }

    #[test]
    fn test_options_force_cpu_wins() {
        let config = ModelConfig::default()
            .with_gpu_layers(20)
            .with_force_cpu(true)
            .with_temperature(0.1);
        let opts = config.options();
        assert_eq!(opts["num_gpu"], 0);
        assert_eq!(opts["temperature"], 0.1);
    }

    #[test]
    fn test_options_gpu_layers() {
        let opts = ModelConfig::default().with_gpu_layers(8).options();
        assert_eq!(opts["num_gpu"], 8);
        assert!(opts.get("temperature").is_none());
    }

    #[test]
    fn test_normalize_scopes() {
        let scopes = normalize_scopes("User.Read, offline_access Notes.ReadWrite openid https://x/y");
        assert_eq!(
            scopes,
            vec![
                "https://graph.microsoft.com/User.Read",
                "https://graph.microsoft.com/Notes.ReadWrite",
                "https://x/y",
            ]
        );
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::from_source(source(&[])).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.graph.tenant_id, "common");
        assert_eq!(config.cors_origins.len(), 2);
        assert!(config.default_notebook.is_none());
        assert_eq!(config.media.tesseract_path, "tesseract");
        assert_eq!(config.http_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_app_config_http_timeout() {
        let config = AppConfig::from_source(source(&[("HTTP_TIMEOUT_SECS", " 15 ")])).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert!(config.http_client().is_ok());

        let config = AppConfig::from_source(source(&[("HTTP_TIMEOUT_SECS", "soon")])).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_app_config_bad_port() {
        let err = AppConfig::from_source(source(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, AgentError::InvalidConfig(_)));
    }

    #[test]
    fn test_app_config_cors_and_defaults() {
        let config = AppConfig::from_source(source(&[
            ("CORS_ORIGINS", "https://a.example, ,https://b.example"),
            ("DEFAULT_NOTEBOOK", "Personal"),
            ("DEFAULT_SECTION", "Tasks"),
        ]))
        .unwrap();
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.default_notebook.as_deref(), Some("Personal"));
        assert_eq!(config.default_section.as_deref(), Some("Tasks"));
    }
}
