use crate::errors::ConfigError;
use dotenv::dotenv;
use log::debug;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file if present
        // If DOTENV_PATH is set, use that path, otherwise use default
        if let Ok(path) = std::env::var("DOTENV_PATH") {
            let _ = dotenv::from_path(path);
        } else {
            let _ = dotenv();
        }

        debug!("Loading Outlook OAuth configuration from environment");

        // Get required variables
        let client_id = env::var("OUTLOOK_CLIENT_ID")
            .map_err(|_| ConfigError::MissingEnvVar("OUTLOOK_CLIENT_ID".to_string()))?;

        let client_secret = env::var("OUTLOOK_CLIENT_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("OUTLOOK_CLIENT_SECRET".to_string()))?;

        // Tokens are optional: first-time users obtain them through the
        // interactive `auth` flow, after which they live in token storage.
        let refresh_token = env::var("OUTLOOK_REFRESH_TOKEN").ok();
        let access_token = env::var("OUTLOOK_ACCESS_TOKEN").ok();

        debug!("OAuth configuration loaded successfully");

        Ok(Config {
            client_id,
            client_secret,
            refresh_token,
            access_token,
        })
    }
}

// API URL constants
pub const GRAPH_API_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const OAUTH_TOKEN_URL: &str =
    "https://login.microsoftonline.com/common/oauth2/v2.0/token";
pub const OAUTH_AUTHORIZE_URL: &str =
    "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";

/// Scopes requested during the interactive auth flow. `offline_access` is
/// what yields the refresh token the server depends on afterwards.
pub const OAUTH_SCOPES: &str =
    "offline_access User.Read Mail.ReadWrite Mail.Send Calendars.ReadWrite";

/// Fields requested when listing calendar events.
pub const CALENDAR_SELECT_FIELDS: &str = "id,subject,start,end,location,bodyPreview";

/// Fields requested when listing emails.
pub const EMAIL_SELECT_FIELDS: &str =
    "id,subject,from,receivedDateTime,bodyPreview,isRead,hasAttachments";

/// Upper bound on `count` arguments for list tools.
pub const MAX_RESULT_COUNT: u32 = 50;

// Configuration utility functions
pub fn get_token_expiry_seconds() -> u64 {
    std::env::var("TOKEN_EXPIRY_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(600) // Default 10 minutes if not configured
}

/// Timezone substituted when an event time carries none of its own.
pub fn get_default_timezone() -> String {
    std::env::var("OUTLOOK_DEFAULT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string())
}
