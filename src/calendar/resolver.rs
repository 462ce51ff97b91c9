use crate::graph::{encode_path_segment, GraphClient};
use log::{debug, warn};
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Endpoint path of the primary calendar; the ultimate fallback for every
/// resolution.
pub const PRIMARY_CALENDAR_PATH: &str = "me/calendar";

/// References up to this length are treated as display names to resolve;
/// longer strings are assumed to be opaque Graph calendar IDs and used as-is.
const CALENDAR_NAME_MAX_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCacheEntry {
    pub id: String,
    pub name: String,
}

/// Cache of confirmed name-to-calendar matches.
///
/// Keys keep the name exactly as the user typed it but are compared
/// case-insensitively. Entries live for the life of the process; only a
/// confirmed match from the remote listing is ever inserted, so there is no
/// negative caching. Concurrent misses on the same name may both fetch and
/// both insert; last writer wins and both would store the same id.
#[derive(Debug, Default)]
pub struct CalendarCache {
    entries: Mutex<HashMap<String, CalendarCacheEntry>>,
}

impl CalendarCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<CalendarCacheEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let lower = name.to_lowercase();
        entries
            .iter()
            .find(|(key, _)| key.to_lowercase() == lower)
            .map(|(_, entry)| entry.clone())
    }

    pub fn insert(&self, typed_name: &str, entry: CalendarCacheEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(typed_name.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries. Only used by tests for isolation.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}

/// Maps a user-supplied calendar reference to a Graph endpoint path.
///
/// Resolution never fails the caller: an unknown name or a failed lookup
/// degrades to the primary calendar, logged loudly enough to tell an outage
/// apart from a typo after the fact.
#[derive(Debug, Default)]
pub struct CalendarResolver {
    cache: CalendarCache,
}

impl CalendarResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &CalendarCache {
        &self.cache
    }

    /// Resolve a calendar name or ID to a calendar endpoint path.
    ///
    /// Absent or empty references resolve to the primary calendar without
    /// network I/O; long strings are used verbatim as IDs (the remote API
    /// rejects bogus ones downstream); everything else is looked up by name.
    pub async fn resolve_path(
        &self,
        graph: &GraphClient,
        access_token: &str,
        calendar: Option<&str>,
    ) -> String {
        let calendar = match calendar {
            Some(name) if !name.is_empty() => name,
            _ => return PRIMARY_CALENDAR_PATH.to_string(),
        };

        // Check if it looks like a calendar ID (long string)
        if calendar.len() > CALENDAR_NAME_MAX_LEN {
            return format!("me/calendars/{}", calendar);
        }

        // Try to find calendar by name
        if let Some(calendar_id) = self
            .calendar_id_by_name(graph, access_token, calendar)
            .await
        {
            return format!("me/calendars/{}", calendar_id);
        }

        // If not found, fall back to primary calendar
        warn!(
            "Couldn't find calendar \"{}\", falling back to primary calendar",
            calendar
        );
        PRIMARY_CALENDAR_PATH.to_string()
    }

    /// Look up a calendar ID by display name, case-insensitively.
    ///
    /// Lookup failures are swallowed deliberately: the caller always gets
    /// some usable calendar, and the warning log is the only trace.
    async fn calendar_id_by_name(
        &self,
        graph: &GraphClient,
        access_token: &str,
        calendar_name: &str,
    ) -> Option<String> {
        // Check cache first
        if let Some(entry) = self.cache.get(calendar_name) {
            debug!("Using cached calendar ID for \"{}\"", calendar_name);
            return Some(entry.id);
        }

        debug!("Looking for calendar with name \"{}\"", calendar_name);
        let response = match graph
            .call(
                access_token,
                Method::GET,
                "me/calendars",
                None,
                &[
                    ("$select", "id,name".to_string()),
                    ("$top", "50".to_string()),
                ],
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Error finding calendar \"{}\": {}", calendar_name, e);
                return None;
            }
        };

        let calendars = response.get("value")?.as_array()?;
        let lower_name = calendar_name.to_lowercase();
        let matching = calendars.iter().find(|cal| {
            cal.get("name")
                .and_then(Value::as_str)
                .map_or(false, |name| name.to_lowercase() == lower_name)
        })?;

        let id = matching.get("id")?.as_str()?.to_string();
        let name = matching.get("name")?.as_str()?.to_string();
        debug!("Found calendar \"{}\" with ID: {}", calendar_name, id);

        // Cache the confirmed match under the name as typed
        self.cache.insert(
            calendar_name,
            CalendarCacheEntry {
                id: id.clone(),
                name,
            },
        );
        Some(id)
    }
}

/// Fetch all calendars with their metadata for the `list-calendars` tool.
/// Returns an empty list on any failure.
pub async fn get_all_calendars(graph: &GraphClient, access_token: &str) -> Vec<Value> {
    let response = graph
        .call(
            access_token,
            Method::GET,
            "me/calendars",
            None,
            &[
                (
                    "$select",
                    "id,name,canEdit,canShare,canViewPrivateItems,owner,isDefaultCalendar"
                        .to_string(),
                ),
                ("$top", "50".to_string()),
            ],
        )
        .await;

    match response {
        Ok(value) => value
            .get("value")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Err(e) => {
            warn!("Error getting all calendars: {}", e);
            Vec::new()
        }
    }
}

/// Build the endpoint for a single event owned by the current user.
pub fn event_path(event_id: &str) -> String {
    format!("me/events/{}", encode_path_segment(event_id))
}
