use crate::context::OutlookContext;
use crate::email::parse_recipients;
use crate::errors::GraphApiError;
use crate::graph::encode_path_segment;
use log::{error, info};
use reqwest::Method;
use serde_json::{json, Map, Value};

/// Save draft handler - creates a new draft or updates an existing one.
///
/// New drafts are a `POST me/messages`; updates are a `PATCH` carrying only
/// the fields the caller actually provided.
#[allow(clippy::too_many_arguments)]
pub async fn handle_save_draft(
    ctx: &OutlookContext,
    id: Option<&str>,
    to: Option<&str>,
    cc: Option<&str>,
    bcc: Option<&str>,
    subject: Option<&str>,
    body: Option<&str>,
    content_type: Option<&str>,
    importance: Option<&str>,
) -> String {
    let updating = id.filter(|id| !id.is_empty());

    // For updates, at least one field should be provided
    if updating.is_some()
        && to.is_none()
        && cc.is_none()
        && bcc.is_none()
        && subject.is_none()
        && body.is_none()
        && content_type.is_none()
        && importance.is_none()
    {
        return "At least one field (to, cc, bcc, subject, body, contentType, importance) \
                is required when updating a draft."
            .to_string();
    }

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error saving draft: {}", e),
    };

    // Build the message object with only provided fields
    let mut message = Map::new();

    if let Some(subject) = subject {
        message.insert("subject".to_string(), json!(subject));
    }
    if let Some(body) = body {
        message.insert(
            "body".to_string(),
            json!({
                "contentType": content_type.unwrap_or("text"),
                "content": body,
            }),
        );
    }

    let to_recipients = parse_recipients(to);
    if !to_recipients.is_empty() {
        message.insert("toRecipients".to_string(), json!(to_recipients));
    }
    let cc_recipients = parse_recipients(cc);
    if !cc_recipients.is_empty() {
        message.insert("ccRecipients".to_string(), json!(cc_recipients));
    }
    let bcc_recipients = parse_recipients(bcc);
    if !bcc_recipients.is_empty() {
        message.insert("bccRecipients".to_string(), json!(bcc_recipients));
    }
    if let Some(importance) = importance {
        message.insert("importance".to_string(), json!(importance));
    } else if updating.is_none() {
        // New drafts always carry an explicit importance; updates must not
        // overwrite one the draft already has
        message.insert("importance".to_string(), json!("normal"));
    }

    let (result, action) = match updating {
        Some(id) => (
            ctx.graph
                .call(
                    &access_token,
                    Method::PATCH,
                    &format!("me/messages/{}", encode_path_segment(id)),
                    Some(Value::Object(message)),
                    &[],
                )
                .await,
            "updated",
        ),
        None => (
            ctx.graph
                .call(
                    &access_token,
                    Method::POST,
                    "me/messages",
                    Some(Value::Object(message)),
                    &[],
                )
                .await,
            "created",
        ),
    };

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            error!("Failed to save draft: {}", e);
            if e.to_string().contains("404") {
                return "Draft not found. It may have been deleted or already sent. \
                        Use list-emails with folder 'drafts' to see available drafts."
                    .to_string();
            }
            return format!("Error saving draft: {}", e);
        }
    };

    let draft_id = result.get("id").and_then(Value::as_str).unwrap_or("");
    info!("Draft {} with ID {}", action, draft_id);

    let mut lines = vec![format!("Draft {} successfully!", action), String::new()];
    lines.push(format!("Draft ID: {}", draft_id));
    if let Some(subject) = result.get("subject").and_then(Value::as_str) {
        lines.push(format!("Subject: {}", subject));
    }
    if !to_recipients.is_empty() {
        lines.push(format!("To: {} recipient(s)", to_recipients.len()));
    }
    if !cc_recipients.is_empty() {
        lines.push(format!("CC: {} recipient(s)", cc_recipients.len()));
    }
    if !bcc_recipients.is_empty() {
        lines.push(format!("BCC: {} recipient(s)", bcc_recipients.len()));
    }
    lines.push(String::new());
    lines.push(
        "Use send-draft with this ID to send the email, or find it in your Drafts folder \
         in Outlook."
            .to_string(),
    );
    lines.join("\n")
}

/// Send draft handler - sends an existing draft by ID.
pub async fn handle_send_draft(ctx: &OutlookContext, id: &str) -> String {
    if id.is_empty() {
        return "Draft ID is required. Use list-emails with folder 'drafts' to find draft IDs."
            .to_string();
    }

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error sending draft: {}", e),
    };

    // First, get the draft details for the confirmation message
    let draft = match ctx
        .graph
        .call(
            &access_token,
            Method::GET,
            &format!("me/messages/{}", encode_path_segment(id)),
            None,
            &[],
        )
        .await
    {
        Ok(draft) => draft,
        Err(e) => {
            error!("Failed to load draft {}: {}", id, e);
            if e.to_string().contains("404") {
                return "Draft not found. The draft may have been deleted or already sent. \
                        Use list-emails with folder 'drafts' to see available drafts."
                    .to_string();
            }
            return format!("Error sending draft: {}", e);
        }
    };

    // Send the draft - this endpoint takes no body
    if let Err(e) = ctx
        .graph
        .call(
            &access_token,
            Method::POST,
            &format!("me/messages/{}/send", encode_path_segment(id)),
            Some(json!({})),
            &[],
        )
        .await
    {
        error!("Failed to send draft {}: {}", id, e);
        if e.to_string().contains("404") {
            return "Draft not found. The draft may have been deleted or already sent. \
                    Use list-emails with folder 'drafts' to see available drafts."
                .to_string();
        }
        return format!("Error sending draft: {}", e);
    }

    let recipient_count = draft
        .get("toRecipients")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let cc_count = draft
        .get("ccRecipients")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let bcc_count = draft
        .get("bccRecipients")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    let subject = draft
        .get("subject")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("(no subject)");

    let mut recipients = format!("Recipients: {}", recipient_count);
    if cc_count > 0 {
        recipients.push_str(&format!(" + {} CC", cc_count));
    }
    if bcc_count > 0 {
        recipients.push_str(&format!(" + {} BCC", bcc_count));
    }

    info!("Draft {} sent", id);
    format!(
        "Draft sent successfully!\n\nSubject: {}\n{}",
        subject, recipients
    )
}
