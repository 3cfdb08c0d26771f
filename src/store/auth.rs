//! Access tokens for the Graph API.
//!
//! [`DeviceCodeAuth`] implements the OAuth 2.0 device authorization grant
//! against the Microsoft identity platform. Tokens live in memory only:
//! a restart means signing in again.

use crate::config::GraphConfig;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
/// Tokens are treated as expired this long before they actually expire.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);
const DEFAULT_POLL_INTERVAL: u64 = 5;

/// Source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A pre-issued token, returned as-is.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default)]
    message: Option<String>,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenError {
    fn describe(&self) -> String {
        self.error_description
            .clone()
            .unwrap_or_else(|| self.error.clone())
    }
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
    refresh_token: Option<String>,
}

impl CachedToken {
    fn from_response(resp: TokenResponse) -> Self {
        let lifetime = Duration::from_secs(resp.expires_in.unwrap_or(3600));
        Self {
            access_token: resp.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_SKEW),
            refresh_token: resp.refresh_token,
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Device-code sign-in with an in-memory token cache.
///
/// `access_token` tries, in order: the cached token, a refresh-token grant,
/// and finally the interactive device flow, which prints a URL and code for
/// the user and polls until they complete sign-in.
#[derive(Debug)]
pub struct DeviceCodeAuth {
    client: Client,
    client_id: String,
    authority: String,
    scopes: Vec<String>,
    cache: Mutex<Option<CachedToken>>,
}

impl DeviceCodeAuth {
    /// Fails with [`AgentError::InvalidConfig`] when no client id is configured.
    pub fn new(client: Client, config: &GraphConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| AgentError::InvalidConfig("CLIENT_ID is required for the device-code flow".into()))?;
        Ok(Self {
            client,
            client_id,
            authority: config.authority(),
            scopes: config.scopes.clone(),
            cache: Mutex::new(None),
        })
    }

    /// Use another authority, e.g. a local identity server.
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }

    fn scope_param(&self) -> String {
        let mut scope = self.scopes.join(" ");
        scope.push_str(" offline_access");
        scope
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/oauth2/v2.0/{}", self.authority, name)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let scope = self.scope_param();
        let resp = self
            .client
            .post(self.endpoint("token"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("scope", scope.as_str()),
            ])
            .send()
            .await?;
        if resp.status().is_success() {
            return Ok(resp.json().await?);
        }
        let err: TokenError = resp.json().await.unwrap_or_default();
        Err(AgentError::Auth(err.describe()))
    }

    async fn device_flow(&self) -> Result<TokenResponse> {
        let scope = self.scope_param();
        let resp = self
            .client
            .post(self.endpoint("devicecode"))
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            let err: TokenError = resp.json().await.unwrap_or_default();
            return Err(AgentError::Auth(format!(
                "Failed to initiate device code flow. Check 'Allow public client flows'. {}",
                err.describe()
            )));
        }
        let flow: DeviceCodeResponse = resp.json().await?;

        let message = flow.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {}",
                flow.verification_uri, flow.user_code
            )
        });
        tracing::warn!(%message, "device sign-in required");
        println!("{}", message);

        let deadline = Instant::now() + Duration::from_secs(flow.expires_in);
        let mut interval = Duration::from_secs(flow.interval.unwrap_or(DEFAULT_POLL_INTERVAL));

        loop {
            tokio::time::sleep(interval).await;
            if Instant::now() >= deadline {
                return Err(AgentError::Auth("device code expired before sign-in completed".into()));
            }

            let resp = self
                .client
                .post(self.endpoint("token"))
                .form(&[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", flow.device_code.as_str()),
                ])
                .send()
                .await?;
            if resp.status().is_success() {
                return Ok(resp.json().await?);
            }

            let err: TokenError = resp.json().await.unwrap_or_default();
            match err.error.as_str() {
                "authorization_pending" => continue,
                "slow_down" => interval += Duration::from_secs(5),
                _ => return Err(AgentError::Auth(err.describe())),
            }
        }
    }
}

#[async_trait]
impl TokenProvider for DeviceCodeAuth {
    async fn access_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        let refresh_token = cache.as_ref().and_then(|c| c.refresh_token.clone());
        if let Some(refresh_token) = refresh_token {
            match self.refresh(&refresh_token).await {
                Ok(resp) => {
                    let mut fresh = CachedToken::from_response(resp);
                    if fresh.refresh_token.is_none() {
                        fresh.refresh_token = Some(refresh_token);
                    }
                    let token = fresh.access_token.clone();
                    *cache = Some(fresh);
                    return Ok(token);
                }
                Err(e) => tracing::warn!(error = %e, "token refresh failed, starting device flow"),
            }
        }

        let fresh = CachedToken::from_response(self.device_flow().await?);
        let token = fresh.access_token.clone();
        *cache = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("abc");
        assert_eq!(provider.access_token().await.unwrap(), "abc");
    }

    #[test]
    fn test_requires_client_id() {
        let err = DeviceCodeAuth::new(Client::new(), &GraphConfig::default()).unwrap_err();
        assert!(matches!(err, AgentError::InvalidConfig(_)));
    }

    #[test]
    fn test_scope_param_adds_offline_access() {
        let config = GraphConfig {
            client_id: Some("id".into()),
            ..GraphConfig::default()
        };
        let auth = DeviceCodeAuth::new(Client::new(), &config).unwrap();
        assert_eq!(
            auth.scope_param(),
            "https://graph.microsoft.com/User.Read https://graph.microsoft.com/Notes.ReadWrite offline_access"
        );
        assert_eq!(
            auth.endpoint("token"),
            "https://login.microsoftonline.com/common/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_cached_token_expiry_skew() {
        let short = CachedToken::from_response(TokenResponse {
            access_token: "t".into(),
            expires_in: Some(30),
            refresh_token: None,
        });
        assert!(!short.is_fresh());

        let long = CachedToken::from_response(TokenResponse {
            access_token: "t".into(),
            expires_in: Some(3600),
            refresh_token: None,
        });
        assert!(long.is_fresh());
    }

    #[test]
    fn test_token_error_description() {
        let err: TokenError =
            serde_json::from_str(r#"{"error": "expired_token", "error_description": "AADSTS70020"}"#).unwrap();
        assert_eq!(err.describe(), "AADSTS70020");
        let err: TokenError = serde_json::from_str(r#"{"error": "access_denied"}"#).unwrap();
        assert_eq!(err.describe(), "access_denied");
    }
}
