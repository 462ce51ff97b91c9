use crate::auth::TokenManager;
use crate::calendar::resolver::CalendarResolver;
use crate::config::{get_default_timezone, Config};
use crate::errors::{GraphApiError, GraphResult};
use crate::graph::GraphClient;
use crate::token_storage::TokenStorage;
use log::warn;
use reqwest::Client;
use tokio::sync::Mutex;

/// Process-wide state shared by every tool handler: the token manager and
/// the calendar-name cache (inside the resolver) are the only mutable
/// singletons in the server.
pub struct OutlookContext {
    pub graph: GraphClient,
    pub resolver: CalendarResolver,
    pub default_timezone: String,
    tokens: Mutex<TokenManager>,
    http: Client,
}

impl OutlookContext {
    /// Context backed by the real Graph API, with token persistence when a
    /// config directory is available.
    pub fn new(config: &Config) -> Self {
        let tokens = match TokenStorage::new(&config.client_secret) {
            Ok(storage) => TokenManager::with_storage(config, storage),
            Err(e) => {
                warn!("Token storage unavailable ({}); tokens will not persist", e);
                TokenManager::new(config)
            }
        };
        Self::with_parts(tokens, GraphClient::new())
    }

    /// Context assembled from explicit parts (used by tests to wire in mock
    /// servers and pre-seeded token managers).
    pub fn with_parts(tokens: TokenManager, graph: GraphClient) -> Self {
        Self {
            graph,
            resolver: CalendarResolver::new(),
            default_timezone: get_default_timezone(),
            tokens: Mutex::new(tokens),
            http: Client::new(),
        }
    }

    /// The authentication gate every tool calls through.
    ///
    /// With `force_new` the stored token is bypassed entirely and the call
    /// always fails with `AuthenticationRequired`: interactive re-auth lives
    /// in an external flow, this surface only signals that it is needed now.
    pub async fn ensure_authenticated(&self, force_new: bool) -> GraphResult<String> {
        if force_new {
            return Err(GraphApiError::AuthenticationRequired);
        }

        let mut tokens = self.tokens.lock().await;
        tokens.get_token(&self.http).await
    }

    /// Snapshot of the token state for the `check-auth-status` tool.
    pub async fn token_status(&self) -> (bool, bool, u64) {
        let tokens = self.tokens.lock().await;
        (
            tokens.has_token(),
            tokens.is_valid(),
            tokens.seconds_until_expiry(),
        )
    }
}
