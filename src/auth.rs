use crate::config::{get_token_expiry_seconds, Config, OAUTH_SCOPES, OAUTH_TOKEN_URL};
use crate::errors::{GraphApiError, GraphResult};
use crate::token_storage::{StoredTokens, TokenStorage};
use log::{debug, error, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Alias for backward compatibility within this module
type Result<T> = GraphResult<T>;

// Token response for OAuth2
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    // Microsoft rotates refresh tokens on use
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: String,
}

/// OAuth token manager: the single owner of access/refresh token state.
///
/// `get_token` returns the stored access token while it is still valid,
/// otherwise it attempts exactly one refresh. A failed refresh clears all
/// stored state and surfaces `AuthenticationRequired`; recovery from that
/// point needs the interactive auth flow.
#[derive(Debug, Clone)]
pub struct TokenManager {
    access_token: String,
    expiry: SystemTime,
    refresh_token: String,
    client_id: String,
    client_secret: String,
    token_url: String,
    storage: Option<TokenStorage>,
}

impl TokenManager {
    pub fn new(config: &Config) -> Self {
        let expiry = if config.access_token.is_some() {
            // If we have an initial access token, use the configurable default
            SystemTime::now() + Duration::from_secs(get_token_expiry_seconds())
        } else {
            // Otherwise set expiry to now to force a refresh
            SystemTime::now()
        };

        Self {
            access_token: config.access_token.clone().unwrap_or_default(),
            expiry,
            refresh_token: config.refresh_token.clone().unwrap_or_default(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: OAUTH_TOKEN_URL.to_string(),
            storage: None,
        }
    }

    /// Build a manager that restores persisted tokens and writes refreshed
    /// ones back. Tokens on disk take precedence over environment ones,
    /// since the auth flow keeps the disk copy current.
    pub fn with_storage(config: &Config, storage: TokenStorage) -> Self {
        let mut manager = Self::new(config);

        match storage.load() {
            Ok(Some(stored)) => {
                debug!("Restored tokens from storage");
                manager.access_token = stored.access_token;
                manager.refresh_token = stored.refresh_token;
                manager.expiry = UNIX_EPOCH + Duration::from_secs(stored.expires_at);
            }
            Ok(None) => debug!("No stored tokens found"),
            Err(e) => warn!("Could not restore stored tokens: {}", e),
        }

        manager.storage = Some(storage);
        manager
    }

    /// Override the token endpoint (used by tests against a mock server).
    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self
    }

    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.has_token() && SystemTime::now() < self.expiry
    }

    pub fn seconds_until_expiry(&self) -> u64 {
        self.expiry
            .duration_since(SystemTime::now())
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Replace all token state with freshly authorized tokens (from the
    /// interactive auth flow) and persist them.
    pub fn install_tokens(&mut self, access_token: &str, refresh_token: &str, expires_in: u64) {
        let expires_in = expires_in.saturating_sub(60); // 1 minute buffer
        self.access_token = access_token.to_string();
        self.refresh_token = refresh_token.to_string();
        self.expiry = SystemTime::now() + Duration::from_secs(expires_in);
        self.persist();
    }

    pub async fn get_token(&mut self, client: &Client) -> Result<String> {
        // Debug log the initial state
        debug!(
            "Token status check - have token: {}, valid: {}",
            self.has_token(),
            SystemTime::now() < self.expiry
        );

        // Check if current token is still valid
        if self.is_valid() {
            debug!("Using existing token");
            return Ok(self.access_token.clone());
        }

        debug!("OAuth token expired or not set, refreshing");

        if self.refresh_token.is_empty() {
            warn!("No refresh token available; interactive authentication needed");
            self.clear_state();
            return Err(GraphApiError::AuthenticationRequired);
        }

        // Refresh the token; exactly one attempt, no retries
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
            ("scope", OAUTH_SCOPES),
        ];

        // Log request details for troubleshooting (but hide credentials)
        debug!("Requesting token from {}", self.token_url);
        // Securely log truncated credential information - never log full credentials
        if log::log_enabled!(log::Level::Debug) {
            let client_id_trunc = if self.client_id.len() > 8 {
                format!(
                    "{}...{}",
                    &self.client_id[..4],
                    &self.client_id[self.client_id.len().saturating_sub(4)..]
                )
            } else {
                "<short-id>".to_string()
            };

            let refresh_token_trunc = if self.refresh_token.len() > 8 {
                format!("{}...", &self.refresh_token[..4])
            } else {
                "<short-token>".to_string()
            };

            debug!("Using client_id: {} (truncated)", client_id_trunc);
            debug!(
                "Using refresh_token starting with: {} (truncated)",
                refresh_token_trunc
            );
        }

        let response = match client.post(&self.token_url).form(&params).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Token refresh request failed: {}", e);
                self.clear_state();
                return Err(GraphApiError::AuthenticationRequired);
            }
        };

        let status = response.status();
        debug!("Token response status: {}", status);

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no response body>".to_string());

            error!(
                "Token refresh failed. Status: {}, Error: {}",
                status, error_text
            );
            self.clear_state();
            return Err(GraphApiError::AuthenticationRequired);
        }

        let token_data: TokenResponse = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to parse token response: {}", e);
                self.clear_state();
                return Err(GraphApiError::AuthenticationRequired);
            }
        };

        // Update token and expiry together; partial updates never happen
        self.access_token = token_data.access_token;
        // Set expiry to slightly less than the actual expiry to be safe
        let expires_in = token_data.expires_in.saturating_sub(60); // 1 minute buffer
        self.expiry = SystemTime::now() + Duration::from_secs(expires_in);
        if let Some(rotated) = token_data.refresh_token {
            self.refresh_token = rotated;
        }
        self.persist();

        debug!(
            "Token refreshed successfully, valid for {} seconds",
            expires_in
        );
        // Securely log truncated token - never log the full token
        if log::log_enabled!(log::Level::Debug) {
            let token_trunc = if self.access_token.len() > 10 {
                format!(
                    "{}...{}",
                    &self.access_token[..4],
                    &self.access_token[self.access_token.len().saturating_sub(4)..]
                )
            } else {
                "<short-token>".to_string()
            };
            debug!("Token (truncated): {}", token_trunc);
        };

        Ok(self.access_token.clone())
    }

    fn clear_state(&mut self) {
        self.access_token.clear();
        self.refresh_token.clear();
        self.expiry = SystemTime::now();
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.clear() {
                warn!("Failed to clear token storage: {}", e);
            }
        }
    }

    fn persist(&self) {
        if let Some(storage) = &self.storage {
            let expires_at = self
                .expiry
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let stored = StoredTokens {
                access_token: self.access_token.clone(),
                refresh_token: self.refresh_token.clone(),
                expires_at,
            };
            if let Err(e) = storage.save(&stored) {
                warn!("Failed to persist refreshed tokens: {}", e);
            }
        }
    }
}
