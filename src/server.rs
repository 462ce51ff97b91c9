use log::{debug, info};
use mcp_attr::server::{mcp_server, McpServer};
use mcp_attr::Result as McpResult;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::calendar::{events, list, respond};
use crate::config::Config;
use crate::context::OutlookContext;
use crate::email::search::{self, SearchCriteria};
use crate::email::{drafts, list as email_list, send};

// Helper functions
mod helpers {
    use log::debug;

    /// Converts a serde_json::Value (string or number) to u32 with a default value
    ///
    /// Tool-calling agents are inconsistent about whether counts arrive as
    /// numbers (3) or strings ("3"); accept both.
    pub fn parse_count(value: Option<serde_json::Value>, default: u32) -> u32 {
        match value {
            Some(val) => match val {
                serde_json::Value::Number(num) => {
                    if let Some(n) = num.as_u64() {
                        if n <= u32::MAX as u64 {
                            n as u32
                        } else {
                            debug!("Number too large for u32, using default {}", default);
                            default
                        }
                    } else {
                        debug!("Number not convertible to u32, using default {}", default);
                        default
                    }
                }
                serde_json::Value::String(s) => match s.parse::<u32>() {
                    Ok(n) => n,
                    Err(_) => {
                        debug!(
                            "Could not parse string '{}' as u32, using default {}",
                            s, default
                        );
                        default
                    }
                },
                _ => {
                    debug!(
                        "Unexpected value type for count: {:?}, using default {}",
                        val, default
                    );
                    default
                }
            },
            None => default,
        }
    }
}

/// MCP server for Outlook mail and calendar access via Microsoft Graph.
///
/// The context (token manager, calendar-name cache, Graph client) is built
/// lazily on first use and shared by all tool invocations for the life of
/// the process.
#[derive(Clone, Default)]
pub struct OutlookServer {
    ctx: Arc<OnceCell<OutlookContext>>,
}

impl OutlookServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server over a pre-built context (used by tests to wire in mock
    /// servers).
    pub fn with_context(ctx: OutlookContext) -> Self {
        Self {
            ctx: Arc::new(OnceCell::new_with(Some(ctx))),
        }
    }

    async fn context(&self) -> Result<&OutlookContext, String> {
        self.ctx
            .get_or_try_init(|| async {
                let config = Config::from_env().map_err(|e| {
                    format!(
                        "Configuration error: {}. Set OUTLOOK_CLIENT_ID and \
                         OUTLOOK_CLIENT_SECRET (see the README) and restart the server.",
                        e
                    )
                })?;
                debug!("Building Outlook context");
                Ok(OutlookContext::new(&config))
            })
            .await
    }
}

// All tool handlers catch their own errors and report them as text; nothing
// propagates past this boundary except missing configuration.
#[mcp_server]
impl McpServer for OutlookServer {
    /// Outlook MCP Server
    ///
    /// This MCP server provides access to Outlook mail and calendar through
    /// the Microsoft Graph API. It requires the following environment
    /// variables to be set:
    /// - OUTLOOK_CLIENT_ID
    /// - OUTLOOK_CLIENT_SECRET
    ///
    /// Run `mcp-outlookcal auth` once to obtain tokens interactively.
    #[prompt]
    async fn outlook_prompt(&self) -> McpResult<&str> {
        Ok("Outlook MCP Server")
    }

    /// Start a new authentication flow
    ///
    /// The server itself cannot complete interactive sign-in; this tool
    /// reports how to run it.
    #[tool]
    async fn authenticate(&self) -> McpResult<String> {
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };

        // Forced re-authentication always reports that an interactive step
        // is needed; the stored token is deliberately bypassed.
        let _ = ctx.ensure_authenticated(true).await;
        Ok(
            "Authentication required. Run `mcp-outlookcal auth` in a terminal to sign in \
             with your Microsoft account, then retry your request."
                .to_string(),
        )
    }

    /// Check the current authentication status
    #[tool]
    async fn check_auth_status(&self) -> McpResult<String> {
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };

        let (has_token, valid, seconds_left) = ctx.token_status().await;
        let status = if valid {
            format!(
                "Authenticated. Access token valid for another {} seconds.",
                seconds_left
            )
        } else if has_token {
            "Access token expired; it will be refreshed on the next request.".to_string()
        } else {
            "Not authenticated. Use the 'authenticate' tool to sign in.".to_string()
        };
        Ok(status)
    }

    /// Lists all calendars in your Outlook account
    #[tool]
    async fn list_calendars(&self) -> McpResult<String> {
        info!("=== START list_calendars MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let text = list::handle_list_calendars(ctx).await;
        info!("=== END list_calendars MCP command ===");
        Ok(text)
    }

    /// Lists upcoming events from your calendar
    ///
    /// Args:
    ///   calendar: Optional calendar name or ID (default: primary calendar). Use 'list-calendars' to see available calendars.
    ///   count: Optional number of events to retrieve (default: 10, max: 50). Can be a number (3) or a string ("3").
    ///   start_date: Optional ISO 8601 start of the window (default: now)
    ///   end_date: Optional ISO 8601 end of the window (default: 30 days from now)
    #[tool]
    async fn list_events(
        &self,
        calendar: Option<String>,
        count: Option<serde_json::Value>,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> McpResult<String> {
        info!("=== START list_events MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let count = helpers::parse_count(count, 10);
        let text = list::handle_list_events(
            ctx,
            calendar.as_deref(),
            count,
            start_date.as_deref(),
            end_date.as_deref(),
        )
        .await;
        info!("=== END list_events MCP command ===");
        Ok(text)
    }

    /// Creates a new calendar event (one-time or recurring)
    ///
    /// Args:
    ///   subject: The subject of the event
    ///   start: Start time; ISO 8601 string or {dateTime, timeZone} object
    ///   end: End time; ISO 8601 string or {dateTime, timeZone} object
    ///   calendar: Optional calendar name or ID (default: primary calendar)
    ///   attendees: Optional list of attendee email addresses
    ///   body: Optional body content for the event
    ///   recurrence: Optional recurrence with pattern {type: daily|weekly|absoluteMonthly|relativeMonthly|absoluteYearly|relativeYearly, interval, daysOfWeek?, dayOfMonth?, month?, index?} and range {type: endDate|noEnd|numbered, startDate, endDate?, numberOfOccurrences?}
    #[tool]
    async fn create_event(
        &self,
        subject: String,
        start: Option<serde_json::Value>,
        end: Option<serde_json::Value>,
        calendar: Option<String>,
        attendees: Option<Vec<String>>,
        body: Option<String>,
        recurrence: Option<serde_json::Value>,
    ) -> McpResult<String> {
        info!("=== START create_event MCP command ===");
        debug!("create_event called with subject={:?}", subject);
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let text = events::handle_create_event(
            ctx,
            &subject,
            start.as_ref(),
            end.as_ref(),
            calendar.as_deref(),
            attendees.as_deref(),
            body.as_deref(),
            recurrence.as_ref(),
        )
        .await;
        info!("=== END create_event MCP command ===");
        Ok(text)
    }

    /// Responds to a calendar event invitation
    ///
    /// Args:
    ///   event_id: The ID of the event to respond to
    ///   response: One of: accept, decline, tentative (case-insensitive)
    ///   comment: Optional comment to include with the response
    ///   send_response: Whether to notify the organizer (default: true)
    #[tool]
    async fn respond_to_event(
        &self,
        event_id: String,
        response: String,
        comment: Option<String>,
        send_response: Option<bool>,
    ) -> McpResult<String> {
        info!("=== START respond_to_event MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let text = respond::handle_respond_to_event(
            ctx,
            &event_id,
            &response,
            comment.as_deref(),
            send_response.unwrap_or(true),
        )
        .await;
        info!("=== END respond_to_event MCP command ===");
        Ok(text)
    }

    /// Cancels a calendar event you organize, notifying attendees
    ///
    /// Args:
    ///   event_id: The ID of the event to cancel
    ///   comment: Optional comment for cancelling the event
    #[tool]
    async fn cancel_event(
        &self,
        event_id: String,
        comment: Option<String>,
    ) -> McpResult<String> {
        info!("=== START cancel_event MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let text = respond::handle_cancel_event(ctx, &event_id, comment.as_deref()).await;
        info!("=== END cancel_event MCP command ===");
        Ok(text)
    }

    /// Deletes a calendar event
    ///
    /// Args:
    ///   event_id: The ID of the event to delete
    #[tool]
    async fn delete_event(&self, event_id: String) -> McpResult<String> {
        info!("=== START delete_event MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let text = respond::handle_delete_event(ctx, &event_id).await;
        info!("=== END delete_event MCP command ===");
        Ok(text)
    }

    /// Lists recent emails from a mail folder
    ///
    /// Args:
    ///   folder: Email folder to list (e.g. 'inbox', 'sentitems', 'drafts', default: 'inbox')
    ///   count: Optional number of emails to retrieve (default: 10, max: 50). Can be a number (3) or a string ("3").
    #[tool]
    async fn list_emails(
        &self,
        folder: Option<String>,
        count: Option<serde_json::Value>,
    ) -> McpResult<String> {
        info!("=== START list_emails MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let count = helpers::parse_count(count, 10);
        let text = email_list::handle_list_emails(ctx, folder.as_deref(), count).await;
        info!("=== END list_emails MCP command ===");
        Ok(text)
    }

    /// Searches for emails using various criteria
    ///
    /// Args:
    ///   query: Optional free-text search query; cannot be combined with the structured filters below
    ///   folder: Email folder to search in (default: 'inbox')
    ///   from: Optional filter by sender email address or name
    ///   to: Optional filter by recipient email address
    ///   subject: Optional filter by email subject
    ///   has_attachments: Optional filter to only emails with attachments
    ///   unread_only: Optional filter to only unread emails
    ///   count: Optional number of results to return (default: 10, max: 50). Can be a number (3) or a string ("3").
    #[tool]
    #[allow(clippy::too_many_arguments)]
    async fn search_emails(
        &self,
        query: Option<String>,
        folder: Option<String>,
        from: Option<String>,
        to: Option<String>,
        subject: Option<String>,
        has_attachments: Option<bool>,
        unread_only: Option<bool>,
        count: Option<serde_json::Value>,
    ) -> McpResult<String> {
        info!("=== START search_emails MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let count = helpers::parse_count(count, 10);
        let criteria = SearchCriteria {
            from: from.as_deref(),
            to: to.as_deref(),
            subject: subject.as_deref(),
            has_attachments: has_attachments.unwrap_or(false),
            unread_only: unread_only.unwrap_or(false),
        };
        let text = search::handle_search_emails(
            ctx,
            query.as_deref(),
            folder.as_deref(),
            &criteria,
            count,
        )
        .await;
        info!("=== END search_emails MCP command ===");
        Ok(text)
    }

    /// Reads the content of a specific email
    ///
    /// Args:
    ///   id: ID of the email to read
    #[tool]
    async fn read_email(&self, id: String) -> McpResult<String> {
        info!("=== START read_email MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let text = email_list::handle_read_email(ctx, &id).await;
        info!("=== END read_email MCP command ===");
        Ok(text)
    }

    /// Composes and sends a new email
    ///
    /// Args:
    ///   to: Comma-separated list of recipient email addresses
    ///   subject: Email subject
    ///   body: Email body content
    ///   cc: Optional comma-separated list of CC recipients
    ///   bcc: Optional comma-separated list of BCC recipients
    ///   content_type: Body content type: 'text' or 'html' (default: 'text')
    ///   importance: Email importance: normal, high, low (default: normal)
    ///   save_to_sent_items: Whether to save the email to sent items (default: true)
    #[tool]
    #[allow(clippy::too_many_arguments)]
    async fn send_email(
        &self,
        to: String,
        subject: String,
        body: String,
        cc: Option<String>,
        bcc: Option<String>,
        content_type: Option<String>,
        importance: Option<String>,
        save_to_sent_items: Option<bool>,
    ) -> McpResult<String> {
        info!("=== START send_email MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let text = send::handle_send_email(
            ctx,
            &to,
            cc.as_deref(),
            bcc.as_deref(),
            &subject,
            &body,
            content_type.as_deref(),
            importance.as_deref(),
            save_to_sent_items.unwrap_or(true),
        )
        .await;
        info!("=== END send_email MCP command ===");
        Ok(text)
    }

    /// Marks an email as read or unread
    ///
    /// Args:
    ///   id: ID of the email to mark
    ///   is_read: Whether to mark as read (true) or unread (false). Default: true
    #[tool]
    async fn mark_as_read(&self, id: String, is_read: Option<bool>) -> McpResult<String> {
        info!("=== START mark_as_read MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let text = send::handle_mark_as_read(ctx, &id, is_read.unwrap_or(true)).await;
        info!("=== END mark_as_read MCP command ===");
        Ok(text)
    }

    /// Creates a new email draft or updates an existing one
    ///
    /// Drafts are saved to the Drafts folder and can be reviewed in Outlook
    /// before sending.
    ///
    /// Args:
    ///   id: Optional ID of an existing draft to update
    ///   to: Optional comma-separated list of recipient email addresses
    ///   cc: Optional comma-separated list of CC recipients
    ///   bcc: Optional comma-separated list of BCC recipients
    ///   subject: Optional email subject
    ///   body: Optional email body content
    ///   content_type: Body content type: 'text' or 'html' (default: 'text')
    ///   importance: Email importance: normal, high, low
    #[tool]
    #[allow(clippy::too_many_arguments)]
    async fn save_draft(
        &self,
        id: Option<String>,
        to: Option<String>,
        cc: Option<String>,
        bcc: Option<String>,
        subject: Option<String>,
        body: Option<String>,
        content_type: Option<String>,
        importance: Option<String>,
    ) -> McpResult<String> {
        info!("=== START save_draft MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let text = drafts::handle_save_draft(
            ctx,
            id.as_deref(),
            to.as_deref(),
            cc.as_deref(),
            bcc.as_deref(),
            subject.as_deref(),
            body.as_deref(),
            content_type.as_deref(),
            importance.as_deref(),
        )
        .await;
        info!("=== END save_draft MCP command ===");
        Ok(text)
    }

    /// Sends an existing email draft
    ///
    /// Args:
    ///   id: ID of the draft to send. Use list-emails with folder 'drafts' to find draft IDs.
    #[tool]
    async fn send_draft(&self, id: String) -> McpResult<String> {
        info!("=== START send_draft MCP command ===");
        let ctx = match self.context().await {
            Ok(ctx) => ctx,
            Err(msg) => return Ok(msg),
        };
        let text = drafts::handle_send_draft(ctx, &id).await;
        info!("=== END send_draft MCP command ===");
        Ok(text)
    }
}
