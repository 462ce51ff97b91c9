use crate::calendar::resolver::get_all_calendars;
use crate::config::{CALENDAR_SELECT_FIELDS, MAX_RESULT_COUNT};
use crate::context::OutlookContext;
use crate::errors::GraphApiError;
use chrono::{Duration, SecondsFormat, Utc};
use log::error;
use reqwest::Method;
use serde_json::Value;

/// List calendars handler.
pub async fn handle_list_calendars(ctx: &OutlookContext) -> String {
    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error listing calendars: {}", e),
    };

    let calendars = get_all_calendars(&ctx.graph, &access_token).await;

    if calendars.is_empty() {
        return "No calendars found.".to_string();
    }

    let calendar_list = calendars
        .iter()
        .enumerate()
        .map(|(index, calendar)| format_calendar(index, calendar))
        .collect::<Vec<_>>()
        .join("\n");

    format!("Found {} calendars:\n\n{}", calendars.len(), calendar_list)
}

fn format_calendar(index: usize, calendar: &Value) -> String {
    let name = calendar
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("(unnamed)");
    let id = calendar.get("id").and_then(Value::as_str).unwrap_or("");

    let is_default = if calendar
        .get("isDefaultCalendar")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        " [DEFAULT]"
    } else {
        ""
    };

    let owner = calendar
        .get("owner")
        .and_then(|owner| owner.get("name"))
        .and_then(Value::as_str)
        .map(|owner| format!(" (Owner: {})", owner))
        .unwrap_or_default();

    let mut permissions = Vec::new();
    for (field, label) in [
        ("canEdit", "edit"),
        ("canShare", "share"),
        ("canViewPrivateItems", "view-private"),
    ] {
        if calendar.get(field).and_then(Value::as_bool).unwrap_or(false) {
            permissions.push(label);
        }
    }
    let perms = if permissions.is_empty() {
        String::new()
    } else {
        format!(" - Permissions: {}", permissions.join(", "))
    };

    format!(
        "{}. {}{}{}{}\nID: {}\n",
        index + 1,
        name,
        is_default,
        owner,
        perms,
        id
    )
}

/// List events handler.
///
/// Uses `calendarView` so recurring series are expanded into their
/// occurrences. The window defaults to the next 30 days when the caller
/// gives no explicit range.
pub async fn handle_list_events(
    ctx: &OutlookContext,
    calendar: Option<&str>,
    count: u32,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> String {
    let count = count.min(MAX_RESULT_COUNT);

    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error listing events: {}", e),
    };

    let calendar_path = ctx
        .resolver
        .resolve_path(&ctx.graph, &access_token, calendar)
        .await;
    let endpoint = format!("{}/calendarView", calendar_path);

    // calendarView requires an explicit time range
    let start_date_time = start_date.map(str::to_string).unwrap_or_else(|| {
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    });
    let end_date_time = end_date.map(str::to_string).unwrap_or_else(|| {
        (Utc::now() + Duration::days(30)).to_rfc3339_opts(SecondsFormat::Secs, true)
    });

    let query = [
        ("startDateTime", start_date_time),
        ("endDateTime", end_date_time),
        ("$top", count.to_string()),
        ("$orderby", "start/dateTime".to_string()),
        ("$select", CALENDAR_SELECT_FIELDS.to_string()),
    ];

    let response = match ctx
        .graph
        .call(&access_token, Method::GET, &endpoint, None, &query)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to list events: {}", e);
            return format!("Error listing events: {}", e);
        }
    };

    let events = response
        .get("value")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if events.is_empty() {
        return "No calendar events found.".to_string();
    }

    let event_list = events
        .iter()
        .enumerate()
        .map(|(index, event)| format_event(index, event))
        .collect::<Vec<_>>()
        .join("\n");

    format!("Found {} events:\n\n{}", events.len(), event_list)
}

fn format_event(index: usize, event: &Value) -> String {
    let subject = event
        .get("subject")
        .and_then(Value::as_str)
        .unwrap_or("(no subject)");
    let id = event.get("id").and_then(Value::as_str).unwrap_or("");
    let location = event
        .get("location")
        .and_then(|location| location.get("displayName"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or("No location");
    let preview = event
        .get("bodyPreview")
        .and_then(Value::as_str)
        .unwrap_or("");

    format!(
        "{}. {} - Location: {}\nStart: {}\nEnd: {}\nSummary: {}\nID: {}\n",
        index + 1,
        subject,
        location,
        format_event_time(event.get("start")),
        format_event_time(event.get("end")),
        preview,
        id
    )
}

fn format_event_time(time: Option<&Value>) -> String {
    let Some(time) = time else {
        return "(unknown)".to_string();
    };
    let date_time = time
        .get("dateTime")
        .and_then(Value::as_str)
        .unwrap_or("(unknown)");
    match time.get("timeZone").and_then(Value::as_str) {
        Some(zone) => format!("{} ({})", date_time, zone),
        None => date_time.to_string(),
    }
}
