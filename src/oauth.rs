//! Interactive OAuth2 authorization-code flow with PKCE.
//!
//! Runs outside the MCP server proper: `mcp-outlookcal auth` opens the
//! system browser, catches the redirect on a local listener, exchanges the
//! code for tokens, and persists them through [`TokenStorage`]. The server
//! only ever refreshes; it never initiates this flow itself.

use crate::config::{Config, OAUTH_AUTHORIZE_URL, OAUTH_SCOPES, OAUTH_TOKEN_URL};
use crate::token_storage::{StoredTokens, TokenStorage};
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use log::{debug, info, warn};
use rand::RngCore;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use url::Url;
use uuid::Uuid;

const REDIRECT_PORT: u16 = 8835;

type BoxError = Box<dyn std::error::Error>;

#[derive(Debug, Deserialize)]
struct AuthTokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Clone)]
struct CallbackState {
    expected_state: String,
    code_sender: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

/// Run the full interactive authentication flow and persist the resulting
/// tokens.
pub async fn run_oauth_flow() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    let redirect_uri = format!("http://localhost:{}/callback", REDIRECT_PORT);

    // PKCE verifier and challenge
    let mut verifier_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut verifier_bytes);
    let code_verifier = base64::encode_config(verifier_bytes, base64::URL_SAFE_NO_PAD);
    let challenge_digest = Sha256::digest(code_verifier.as_bytes());
    let code_challenge = base64::encode_config(challenge_digest, base64::URL_SAFE_NO_PAD);

    let state = Uuid::new_v4().to_string();

    let authorize_url = Url::parse_with_params(
        OAUTH_AUTHORIZE_URL,
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri.as_str()),
            ("response_mode", "query"),
            ("scope", OAUTH_SCOPES),
            ("state", state.as_str()),
            ("code_challenge", code_challenge.as_str()),
            ("code_challenge_method", "S256"),
        ],
    )?;

    let (code_sender, code_receiver) = oneshot::channel::<String>();
    let callback_state = CallbackState {
        expected_state: state,
        code_sender: Arc::new(Mutex::new(Some(code_sender))),
    };

    let app = Router::new()
        .route("/callback", get(handle_callback))
        .with_state(callback_state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", REDIRECT_PORT)).await?;
    info!("Listening for OAuth redirect on {}", redirect_uri);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("OAuth redirect listener error: {}", e);
        }
    });

    println!("Opening your browser to sign in to Microsoft...");
    println!("If the browser does not open, visit:\n\n{}\n", authorize_url);
    if webbrowser::open(authorize_url.as_str()).is_err() {
        warn!("Could not open browser automatically");
    }

    // Wait for the redirect to deliver the authorization code
    let code = code_receiver.await?;
    server.abort();
    debug!("Received authorization code");

    let tokens = exchange_code(&config, &code, &code_verifier, &redirect_uri).await?;

    let storage = TokenStorage::new(&config.client_secret)?;
    storage.save(&tokens)?;

    println!("Authentication successful! Tokens saved.");
    println!("Token file: {}", storage.path().display());
    Ok(())
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    if let Some(error) = params.get("error") {
        warn!("Authorization was denied: {}", error);
        return Html("<h1>Authentication failed</h1><p>You can close this window.</p>");
    }

    if params.get("state").map(String::as_str) != Some(state.expected_state.as_str()) {
        warn!("OAuth state mismatch; ignoring callback");
        return Html("<h1>Authentication failed</h1><p>State mismatch.</p>");
    }

    let Some(code) = params.get("code") else {
        return Html("<h1>Authentication failed</h1><p>No authorization code received.</p>");
    };

    // The channel only carries the first valid code
    if let Some(sender) = state.code_sender.lock().unwrap_or_else(|e| e.into_inner()).take() {
        let _ = sender.send(code.clone());
    }
    Html("<h1>Authentication successful!</h1><p>You can close this window and return to the terminal.</p>")
}

async fn exchange_code(
    config: &Config,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
) -> Result<StoredTokens, BoxError> {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("grant_type", "authorization_code"),
        ("code_verifier", code_verifier),
        ("scope", OAUTH_SCOPES),
    ];

    let response = Client::new()
        .post(OAUTH_TOKEN_URL)
        .form(&params)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no response body>".to_string());
        return Err(format!(
            "Token exchange failed. Status: {}, Error: {}",
            status, error_text
        )
        .into());
    }

    let token_data: AuthTokenResponse = response.json().await?;
    let expires_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        + token_data.expires_in.saturating_sub(60);

    Ok(StoredTokens {
        access_token: token_data.access_token,
        refresh_token: token_data.refresh_token,
        expires_at,
    })
}

/// Verify the stored credentials by fetching the signed-in user's profile.
pub async fn test_credentials() -> Result<String, BoxError> {
    use crate::auth::TokenManager;
    use crate::graph::GraphClient;
    use reqwest::Method;

    let config = Config::from_env()?;
    let storage = TokenStorage::new(&config.client_secret)?;
    let mut tokens = TokenManager::with_storage(&config, storage);

    let client = Client::new();
    let access_token = tokens.get_token(&client).await?;

    let graph = GraphClient::new();
    let profile = graph
        .call(&access_token, Method::GET, "me", None, &[])
        .await?;

    let name = profile
        .get("displayName")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("(unknown)");
    let mail = profile
        .get("mail")
        .or_else(|| profile.get("userPrincipalName"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("(unknown)");

    Ok(format!("Signed in as {} <{}>", name, mail))
}
