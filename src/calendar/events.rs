use crate::calendar::recurrence::{self, Recurrence};
use crate::context::OutlookContext;
use crate::errors::GraphApiError;
use log::{debug, error, info};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

/// An event time as supplied by the caller: either a bare ISO-8601 string or
/// an explicit `{dateTime, timeZone}` pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    Zoned {
        #[serde(rename = "dateTime")]
        date_time: String,
        #[serde(rename = "timeZone", default)]
        time_zone: Option<String>,
    },
    Plain(String),
}

impl EventTime {
    pub fn is_empty(&self) -> bool {
        match self {
            EventTime::Zoned { date_time, .. } => date_time.is_empty(),
            EventTime::Plain(s) => s.is_empty(),
        }
    }

    /// Shape for the Graph payload, substituting the configured default
    /// timezone when none was given.
    fn to_graph(&self, default_timezone: &str) -> Value {
        match self {
            EventTime::Zoned {
                date_time,
                time_zone,
            } => json!({
                "dateTime": date_time,
                "timeZone": time_zone.as_deref().unwrap_or(default_timezone),
            }),
            EventTime::Plain(date_time) => json!({
                "dateTime": date_time,
                "timeZone": default_timezone,
            }),
        }
    }
}

/// The shaped create-event request: endpoint path, JSON payload, and whether
/// the payload carries a recurrence (for the caller's user-facing wording).
#[derive(Debug, Clone)]
pub struct EventRequest {
    pub path: String,
    pub body: Value,
    pub recurring: bool,
}

/// Compose the create-event payload the Graph API expects. No I/O here;
/// the recurrence (if any) has already been validated and is attached
/// verbatim.
#[allow(clippy::too_many_arguments)]
pub fn build_event_request(
    subject: &str,
    start: &EventTime,
    end: &EventTime,
    calendar_path: &str,
    attendees: Option<&[String]>,
    body: Option<&str>,
    recurrence: Option<&Value>,
    default_timezone: &str,
) -> EventRequest {
    let mut payload = json!({
        "subject": subject,
        "start": start.to_graph(default_timezone),
        "end": end.to_graph(default_timezone),
        "body": {
            "contentType": "HTML",
            "content": body.unwrap_or(""),
        },
    });

    if let Some(attendees) = attendees {
        let mapped: Vec<Value> = attendees
            .iter()
            .map(|email| {
                json!({
                    "emailAddress": { "address": email },
                    "type": "required",
                })
            })
            .collect();
        payload["attendees"] = Value::Array(mapped);
    }

    let recurring = recurrence.is_some();
    if let Some(recurrence) = recurrence {
        payload["recurrence"] = recurrence.clone();
    }

    EventRequest {
        path: format!("{}/events", calendar_path),
        body: payload,
        recurring,
    }
}

/// Create event handler: validates, resolves the calendar, shapes the
/// request, and issues it. All failures come back as text for the caller.
#[allow(clippy::too_many_arguments)]
pub async fn handle_create_event(
    ctx: &OutlookContext,
    subject: &str,
    start: Option<&Value>,
    end: Option<&Value>,
    calendar: Option<&str>,
    attendees: Option<&[String]>,
    body: Option<&str>,
    recurrence: Option<&Value>,
) -> String {
    const REQUIRED_MSG: &str = "Subject, start, and end times are required to create an event.";

    let (start, end) = match (parse_time(start), parse_time(end)) {
        (Some(start), Some(end)) => (start, end),
        _ => return REQUIRED_MSG.to_string(),
    };

    if subject.is_empty() || start.is_empty() || end.is_empty() {
        return REQUIRED_MSG.to_string();
    }

    // Validate recurrence if provided, before touching the network
    if let Some(raw) = recurrence {
        let parsed: Recurrence = match serde_json::from_value(raw.clone()) {
            Ok(parsed) => parsed,
            Err(e) => return format!("Invalid recurrence pattern: {}", e),
        };
        if let Err(rule) = recurrence::validate(&parsed) {
            return format!("Invalid recurrence pattern: {}", rule);
        }
    }

    // Get access token
    let access_token = match ctx.ensure_authenticated(false).await {
        Ok(token) => token,
        Err(GraphApiError::AuthenticationRequired) => {
            return "Authentication required. Please use the 'authenticate' tool first."
                .to_string()
        }
        Err(e) => return format!("Error creating event: {}", e),
    };

    // Resolve calendar path and build the events endpoint
    let calendar_path = ctx
        .resolver
        .resolve_path(&ctx.graph, &access_token, calendar)
        .await;

    let request = build_event_request(
        subject,
        &start,
        &end,
        &calendar_path,
        attendees,
        body,
        recurrence,
        &ctx.default_timezone,
    );
    debug!("Creating event at {}", request.path);

    match ctx
        .graph
        .call(
            &access_token,
            Method::POST,
            &request.path,
            Some(request.body),
            &[],
        )
        .await
    {
        Ok(_) => {
            info!("Created event '{}' in {}", subject, calendar_path);
            let event_type = if request.recurring {
                "Recurring event"
            } else {
                "Event"
            };
            format!(
                "{} '{}' has been successfully created.",
                event_type, subject
            )
        }
        Err(e) => {
            error!("Failed to create event '{}': {}", subject, e);
            format!("Error creating event: {}", e)
        }
    }
}

fn parse_time(value: Option<&Value>) -> Option<EventTime> {
    let value = value?;
    if value.is_null() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}
