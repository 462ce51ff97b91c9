use crate::context::OutlookContext;
use crate::email::parse_recipients;
use crate::errors::GraphApiError;
use crate::graph::encode_path_segment;
use log::{error, info};
use reqwest::Method;
use serde_json::json;

/// Send email handler: composes and sends a message through `me/sendMail`.
#[allow(clippy::too_many_arguments)]
pub async fn handle_send_email(
    ctx: &OutlookContext,
    to: &str,
    cc: Option<&str>,
    bcc: Option<&str>,
    subject: &str,
    body: &str,
    content_type: Option<&str>,
    importance: Option<&str>,
    save_to_sent_items: bool,
) -> String {
    if to.is_empty() || subject.is_empty() || body.is_empty() {
        return "To, subject, and body are required to send an email.".to_string();
    }

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error sending email: {}", e),
    };

    let to_recipients = parse_recipients(Some(to));
    let cc_recipients = parse_recipients(cc);
    let bcc_recipients = parse_recipients(bcc);

    let mut message = json!({
        "subject": subject,
        "body": {
            "contentType": content_type.unwrap_or("text"),
            "content": body,
        },
        "toRecipients": to_recipients,
        "importance": importance.unwrap_or("normal"),
    });
    if !cc_recipients.is_empty() {
        message["ccRecipients"] = json!(cc_recipients);
    }
    if !bcc_recipients.is_empty() {
        message["bccRecipients"] = json!(bcc_recipients);
    }

    let payload = json!({
        "message": message,
        "saveToSentItems": save_to_sent_items,
    });

    match ctx
        .graph
        .call(&access_token, Method::POST, "me/sendMail", Some(payload), &[])
        .await
    {
        Ok(_) => {
            info!("Email '{}' sent", subject);
            format!("Email '{}' sent successfully.", subject)
        }
        Err(e) => {
            error!("Failed to send email '{}': {}", subject, e);
            format!("Error sending email: {}", e)
        }
    }
}

/// Mark-as-read handler: flips the `isRead` flag on a message.
pub async fn handle_mark_as_read(ctx: &OutlookContext, id: &str, is_read: bool) -> String {
    if id.is_empty() {
        return "Email ID is required. Use 'list-emails' to find email IDs.".to_string();
    }

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error updating email: {}", e),
    };

    let endpoint = format!("me/messages/{}", encode_path_segment(id));
    let body = json!({ "isRead": is_read });

    match ctx
        .graph
        .call(&access_token, Method::PATCH, &endpoint, Some(body), &[])
        .await
    {
        Ok(_) => {
            if is_read {
                "Email marked as read.".to_string()
            } else {
                "Email marked as unread.".to_string()
            }
        }
        Err(e) => {
            error!("Failed to update email {}: {}", id, e);
            if e.to_string().contains("404") {
                return "Email not found. It may have been deleted or the ID is incorrect. \
                        Use 'list-emails' to find valid email IDs."
                    .to_string();
            }
            format!("Error updating email: {}", e)
        }
    }
}
