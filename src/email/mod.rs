//! Email tools: listing, searching, reading, sending, read-state, and
//! drafts.

pub mod drafts;
pub mod list;
pub mod search;
pub mod send;

use serde_json::{json, Value};

/// Parse comma-separated email addresses into the Graph recipient shape.
pub(crate) fn parse_recipients(emails: Option<&str>) -> Vec<Value> {
    let Some(emails) = emails else {
        return Vec::new();
    };
    emails
        .split(',')
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(|email| json!({ "emailAddress": { "address": email } }))
        .collect()
}

/// Render a `from`/recipient object as `Name <address>` where possible.
pub(crate) fn format_address(value: Option<&Value>) -> String {
    let Some(email) = value.and_then(|v| v.get("emailAddress")) else {
        return "(unknown sender)".to_string();
    };
    let address = email.get("address").and_then(Value::as_str).unwrap_or("");
    match email.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => format!("{} <{}>", name, address),
        _ => address.to_string(),
    }
}
