use crate::config::GRAPH_API_BASE_URL;
use crate::errors::{GraphApiError, GraphResult};
use log::{debug, error};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

/// Thin client for the Microsoft Graph REST API.
///
/// Every tool handler funnels its remote calls through [`GraphClient::call`],
/// which authenticates with a bearer token and returns the parsed JSON body.
/// Failed requests produce an error message that embeds the HTTP status, so
/// callers can pattern-match on e.g. `"404"` for friendlier wording.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: Client,
    base_url: String,
}

impl Default for GraphClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphClient {
    pub fn new() -> Self {
        Self::with_base_url(GRAPH_API_BASE_URL)
    }

    /// Build a client against a non-default base URL (used by tests to point
    /// at a local mock server).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a Graph API request against `path` (relative, e.g.
    /// `me/calendars`) with optional JSON body and query parameters.
    ///
    /// Returns the response body parsed as JSON; empty success responses
    /// (202/204, or an empty body) come back as `Value::Null`.
    pub async fn call(
        &self,
        access_token: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: &[(&str, String)],
    ) -> GraphResult<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("Graph API request: {} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(json_body) = body {
            request = request.json(&json_body);
        }

        let response = request.send().await.map_err(|e| {
            error!("Graph API network failure for {} {}: {}", method, url, e);
            GraphApiError::NetworkError(e.to_string())
        })?;

        let status = response.status();
        debug!("Graph API response status: {}", status);

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no response body>".to_string());
            error!(
                "Graph API error for {} {}: {} - {}",
                method, url, status, error_text
            );
            // Keep the status code in the message; handlers look for "404"
            return Err(GraphApiError::ApiError(format!(
                "Graph API error: {} - {}",
                status, error_text
            )));
        }

        if status == StatusCode::NO_CONTENT || status == StatusCode::ACCEPTED {
            return Ok(Value::Null);
        }

        let response_text = response.text().await.map_err(|e| {
            GraphApiError::ApiError(format!("Failed to read Graph API response: {}", e))
        })?;

        if response_text.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse Graph API response: {}", e);
            GraphApiError::ApiError(format!("Failed to parse Graph API response: {}", e))
        })
    }
}

/// Percent-encode a user-supplied ID for use as a single path segment.
/// Graph event and message IDs routinely contain `=` and `+`.
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
