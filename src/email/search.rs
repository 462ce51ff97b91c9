use crate::config::{EMAIL_SELECT_FIELDS, MAX_RESULT_COUNT};
use crate::context::OutlookContext;
use crate::email::list::format_message;
use crate::errors::GraphApiError;
use crate::graph::encode_path_segment;
use log::{debug, error};
use reqwest::Method;
use serde_json::Value;

/// Structured search criteria beyond the free-text query.
#[derive(Debug, Default)]
pub struct SearchCriteria<'a> {
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    pub subject: Option<&'a str>,
    pub has_attachments: bool,
    pub unread_only: bool,
}

impl SearchCriteria<'_> {
    fn is_empty(&self) -> bool {
        self.from.is_none()
            && self.to.is_none()
            && self.subject.is_none()
            && !self.has_attachments
            && !self.unread_only
    }

    /// Build the OData `$filter` expression for these criteria.
    fn to_filter(&self) -> String {
        let mut clauses = Vec::new();

        if let Some(from) = self.from {
            let from = escape_odata_literal(from);
            clauses.push(format!(
                "(contains(from/emailAddress/address,'{0}') or \
                 contains(from/emailAddress/name,'{0}'))",
                from
            ));
        }
        if let Some(to) = self.to {
            clauses.push(format!(
                "toRecipients/any(r:r/emailAddress/address eq '{}')",
                escape_odata_literal(to)
            ));
        }
        if let Some(subject) = self.subject {
            clauses.push(format!(
                "contains(subject,'{}')",
                escape_odata_literal(subject)
            ));
        }
        if self.has_attachments {
            clauses.push("hasAttachments eq true".to_string());
        }
        if self.unread_only {
            clauses.push("isRead eq false".to_string());
        }

        clauses.join(" and ")
    }
}

/// Search emails handler.
///
/// A free-text `query` goes through `$search`; structured criteria become an
/// OData `$filter`. Graph rejects `$search` combined with `$filter` or
/// `$orderby` on messages, so a free-text query takes precedence and the
/// structured criteria are applied only when no query is given.
pub async fn handle_search_emails(
    ctx: &OutlookContext,
    query: Option<&str>,
    folder: Option<&str>,
    criteria: &SearchCriteria<'_>,
    count: u32,
) -> String {
    let count = count.min(MAX_RESULT_COUNT);
    let folder = folder.filter(|f| !f.is_empty()).unwrap_or("inbox");
    let query = query.filter(|q| !q.is_empty());

    if query.is_none() && criteria.is_empty() {
        return "At least one search criterion (query, from, to, subject, hasAttachments, \
                unreadOnly) is required."
            .to_string();
    }

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error searching emails: {}", e),
    };

    let endpoint = format!(
        "me/mailFolders/{}/messages",
        encode_path_segment(&folder.to_lowercase())
    );

    let mut params = vec![
        ("$top", count.to_string()),
        ("$select", EMAIL_SELECT_FIELDS.to_string()),
    ];
    match query {
        Some(query) => {
            // Quoted so multi-word queries search as a phrase
            params.push(("$search", format!("\"{}\"", query.replace('"', ""))));
        }
        None => {
            params.push(("$filter", criteria.to_filter()));
            params.push(("$orderby", "receivedDateTime desc".to_string()));
        }
    }
    debug!("Searching '{}' with {:?}", folder, params);

    let response = match ctx
        .graph
        .call(&access_token, Method::GET, &endpoint, None, &params)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to search emails in '{}': {}", folder, e);
            if e.to_string().contains("404") {
                return format!(
                    "Folder '{}' not found. Try one of: inbox, sentitems, drafts, deleteditems.",
                    folder
                );
            }
            return format!("Error searching emails: {}", e);
        }
    };

    let messages = response
        .get("value")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if messages.is_empty() {
        return "No emails found matching your search.".to_string();
    }

    let email_list = messages
        .iter()
        .enumerate()
        .map(|(index, message)| format_message(index, message))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Found {} matching emails:\n\n{}",
        messages.len(),
        email_list
    )
}

/// Single quotes in OData string literals are escaped by doubling them.
fn escape_odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}
