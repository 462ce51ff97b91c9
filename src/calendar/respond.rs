use crate::calendar::resolver::event_path;
use crate::context::OutlookContext;
use crate::errors::GraphApiError;
use log::{error, info};
use reqwest::Method;
use serde_json::json;

/// Graph endpoints and user-facing labels for meeting responses.
const RESPONSES: [(&str, &str, &str); 3] = [
    ("accept", "accept", "accepted"),
    ("decline", "decline", "declined"),
    ("tentative", "tentativelyAccept", "tentatively accepted"),
];

/// Respond to event handler - accept, decline, or tentatively accept a
/// meeting invite.
pub async fn handle_respond_to_event(
    ctx: &OutlookContext,
    event_id: &str,
    response: &str,
    comment: Option<&str>,
    send_response: bool,
) -> String {
    if event_id.is_empty() {
        return "Event ID is required. Use 'list-events' to find event IDs.".to_string();
    }

    if response.is_empty() {
        return "Response is required. Must be one of: accept, decline, tentative".to_string();
    }

    let normalized = response.to_lowercase();
    let Some((_, action, label)) = RESPONSES
        .iter()
        .find(|(name, _, _)| *name == normalized)
    else {
        return format!(
            "Invalid response '{}'. Must be one of: accept, decline, tentative",
            response
        );
    };

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error responding to event: {}", e),
    };

    let endpoint = format!("{}/{}", event_path(event_id), action);

    let mut body = json!({ "sendResponse": send_response });
    // Only include comment if provided
    if let Some(comment) = comment.filter(|c| !c.is_empty()) {
        body["comment"] = json!(comment);
    }

    match ctx
        .graph
        .call(&access_token, Method::POST, &endpoint, Some(body), &[])
        .await
    {
        Ok(_) => {
            info!("Event {} {}", event_id, label);
            let comment_note = comment
                .filter(|c| !c.is_empty())
                .map(|c| format!("\nComment: \"{}\"", c))
                .unwrap_or_default();
            let notify_note = if send_response {
                ""
            } else {
                "\n(Organizer was not notified)"
            };
            format!("Event {} successfully.{}{}", label, comment_note, notify_note)
        }
        Err(e) => {
            error!("Failed to respond to event {}: {}", event_id, e);
            if e.to_string().contains("404") {
                return "Event not found. The event may have been deleted or the ID is \
                        incorrect. Use 'list-events' to find valid event IDs."
                    .to_string();
            }
            format!("Error responding to event: {}", e)
        }
    }
}

/// Cancel event handler - cancels a meeting the user organizes, notifying
/// attendees.
pub async fn handle_cancel_event(
    ctx: &OutlookContext,
    event_id: &str,
    comment: Option<&str>,
) -> String {
    if event_id.is_empty() {
        return "Event ID is required. Use 'list-events' to find event IDs.".to_string();
    }

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error cancelling event: {}", e),
    };

    let endpoint = format!("{}/cancel", event_path(event_id));
    let body = match comment.filter(|c| !c.is_empty()) {
        Some(comment) => json!({ "comment": comment }),
        None => json!({}),
    };

    match ctx
        .graph
        .call(&access_token, Method::POST, &endpoint, Some(body), &[])
        .await
    {
        Ok(_) => {
            info!("Event {} cancelled", event_id);
            "Event cancelled successfully. Attendees have been notified.".to_string()
        }
        Err(e) => {
            error!("Failed to cancel event {}: {}", event_id, e);
            if e.to_string().contains("404") {
                return "Event not found. The event may have been deleted or the ID is \
                        incorrect. Use 'list-events' to find valid event IDs."
                    .to_string();
            }
            format!("Error cancelling event: {}", e)
        }
    }
}

/// Delete event handler - removes an event from the calendar without
/// notifying anyone.
pub async fn handle_delete_event(ctx: &OutlookContext, event_id: &str) -> String {
    if event_id.is_empty() {
        return "Event ID is required. Use 'list-events' to find event IDs.".to_string();
    }

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error deleting event: {}", e),
    };

    match ctx
        .graph
        .call(
            &access_token,
            Method::DELETE,
            &event_path(event_id),
            None,
            &[],
        )
        .await
    {
        Ok(_) => {
            info!("Event {} deleted", event_id);
            "Event deleted successfully.".to_string()
        }
        Err(e) => {
            error!("Failed to delete event {}: {}", event_id, e);
            if e.to_string().contains("404") {
                return "Event not found. The event may have been deleted or the ID is \
                        incorrect. Use 'list-events' to find valid event IDs."
                    .to_string();
            }
            format!("Error deleting event: {}", e)
        }
    }
}
