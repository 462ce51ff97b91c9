use crate::config::{EMAIL_SELECT_FIELDS, MAX_RESULT_COUNT};
use crate::context::OutlookContext;
use crate::email::format_address;
use crate::errors::GraphApiError;
use crate::graph::encode_path_segment;
use log::error;
use reqwest::Method;
use serde_json::Value;

/// List emails handler. `folder` is a well-known folder name such as
/// `inbox`, `sent`, or `drafts` (default: inbox).
pub async fn handle_list_emails(
    ctx: &OutlookContext,
    folder: Option<&str>,
    count: u32,
) -> String {
    let count = count.min(MAX_RESULT_COUNT);
    let folder = folder.filter(|f| !f.is_empty()).unwrap_or("inbox");

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error listing emails: {}", e),
    };

    let endpoint = format!(
        "me/mailFolders/{}/messages",
        encode_path_segment(&folder.to_lowercase())
    );
    let query = [
        ("$top", count.to_string()),
        ("$orderby", "receivedDateTime desc".to_string()),
        ("$select", EMAIL_SELECT_FIELDS.to_string()),
    ];

    let response = match ctx
        .graph
        .call(&access_token, Method::GET, &endpoint, None, &query)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to list emails in '{}': {}", folder, e);
            if e.to_string().contains("404") {
                return format!(
                    "Folder '{}' not found. Try one of: inbox, sentitems, drafts, deleteditems.",
                    folder
                );
            }
            return format!("Error listing emails: {}", e);
        }
    };

    let messages = response
        .get("value")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if messages.is_empty() {
        return format!("No emails found in '{}'.", folder);
    }

    let email_list = messages
        .iter()
        .enumerate()
        .map(|(index, message)| format_message(index, message))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Found {} emails in '{}':\n\n{}",
        messages.len(),
        folder,
        email_list
    )
}

pub(crate) fn format_message(index: usize, message: &Value) -> String {
    let subject = message
        .get("subject")
        .and_then(Value::as_str)
        .unwrap_or("(no subject)");
    let id = message.get("id").and_then(Value::as_str).unwrap_or("");
    let received = message
        .get("receivedDateTime")
        .and_then(Value::as_str)
        .unwrap_or("(unknown)");
    let unread = if message
        .get("isRead")
        .and_then(Value::as_bool)
        .unwrap_or(true)
    {
        ""
    } else {
        " [UNREAD]"
    };
    let attachments = if message
        .get("hasAttachments")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        " [ATTACHMENTS]"
    } else {
        ""
    };
    let preview = message
        .get("bodyPreview")
        .and_then(Value::as_str)
        .unwrap_or("");

    format!(
        "{}. {}{}{}\nFrom: {}\nReceived: {}\nPreview: {}\nID: {}\n",
        index + 1,
        subject,
        unread,
        attachments,
        format_address(message.get("from")),
        received,
        preview,
        id
    )
}

/// Read email handler: full content of a single message.
pub async fn handle_read_email(ctx: &OutlookContext, id: &str) -> String {
    if id.is_empty() {
        return "Email ID is required. Use 'list-emails' to find email IDs.".to_string();
    }

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error reading email: {}", e),
    };

    let endpoint = format!("me/messages/{}", encode_path_segment(id));
    let query = [(
        "$select",
        "id,subject,from,toRecipients,ccRecipients,receivedDateTime,body,isRead".to_string(),
    )];

    let message = match ctx
        .graph
        .call(&access_token, Method::GET, &endpoint, None, &query)
        .await
    {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to read email {}: {}", id, e);
            if e.to_string().contains("404") {
                return "Email not found. It may have been deleted or the ID is incorrect. \
                        Use 'list-emails' to find valid email IDs."
                    .to_string();
            }
            return format!("Error reading email: {}", e);
        }
    };

    let subject = message
        .get("subject")
        .and_then(Value::as_str)
        .unwrap_or("(no subject)");
    let received = message
        .get("receivedDateTime")
        .and_then(Value::as_str)
        .unwrap_or("(unknown)");
    let to = message
        .get("toRecipients")
        .and_then(Value::as_array)
        .map(|recipients| {
            recipients
                .iter()
                .map(|r| format_address(Some(r)))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    let body = message
        .get("body")
        .and_then(|body| body.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("(empty body)");

    format!(
        "Subject: {}\nFrom: {}\nTo: {}\nReceived: {}\n\n{}",
        subject,
        format_address(message.get("from")),
        to,
        received,
        body
    )
}
