/// Calendar Handler Tests Module
///
/// End-to-end tests for the calendar tool handlers against a mock Graph API
/// server: request shapes on the wire and the user-facing text that comes
/// back.
use mcp_outlookcal::auth::TokenManager;
use mcp_outlookcal::calendar::events::handle_create_event;
use mcp_outlookcal::calendar::list::{handle_list_calendars, handle_list_events};
use mcp_outlookcal::calendar::respond::{
    handle_cancel_event, handle_delete_event, handle_respond_to_event,
};
use mcp_outlookcal::config::Config;
use mcp_outlookcal::context::OutlookContext;
use mcp_outlookcal::graph::GraphClient;
use mockito::Matcher;
use serde_json::json;

fn authed_context(server_url: &str) -> OutlookContext {
    let config = Config {
        client_id: "test_client_id".to_string(),
        client_secret: "test_client_secret".to_string(),
        refresh_token: Some("test_refresh_token".to_string()),
        access_token: Some("test_access_token".to_string()),
    };
    OutlookContext::with_parts(
        TokenManager::new(&config),
        GraphClient::with_base_url(server_url),
    )
}

fn unauthed_context(server_url: &str) -> OutlookContext {
    let config = Config {
        client_id: "test_client_id".to_string(),
        client_secret: "test_client_secret".to_string(),
        refresh_token: None,
        access_token: None,
    };
    OutlookContext::with_parts(
        TokenManager::new(&config),
        GraphClient::with_base_url(server_url),
    )
}

#[tokio::test]
async fn test_create_recurring_event_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("POST", "/me/calendar/events")
        .match_header("authorization", "Bearer test_access_token")
        .match_body(Matcher::PartialJson(json!({
            "subject": "Daily Standup",
            "recurrence": {
                "pattern": { "type": "daily", "interval": 1 },
                "range": {
                    "type": "numbered",
                    "startDate": "2024-03-10",
                    "numberOfOccurrences": 10
                }
            }
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"new-event-id"}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let recurrence = json!({
        "pattern": { "type": "daily", "interval": 1 },
        "range": { "type": "numbered", "startDate": "2024-03-10", "numberOfOccurrences": 10 }
    });
    let result = handle_create_event(
        &ctx,
        "Daily Standup",
        Some(&json!("2024-03-10T09:00:00")),
        Some(&json!("2024-03-10T09:15:00")),
        None,
        None,
        None,
        Some(&recurrence),
    )
    .await;

    assert!(result.contains("Recurring event"));
    assert!(result.contains("Daily Standup"));
    assert!(result.contains("successfully created"));
    create.assert_async().await;
}

#[tokio::test]
async fn test_create_event_without_recurrence() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/me/calendar/events")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"new-event-id"}"#)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_create_event(
        &ctx,
        "One-off Meeting",
        Some(&json!({ "dateTime": "2024-03-10T09:00:00", "timeZone": "UTC" })),
        Some(&json!({ "dateTime": "2024-03-10T10:00:00", "timeZone": "UTC" })),
        None,
        None,
        None,
        None,
    )
    .await;

    assert_eq!(
        result,
        "Event 'One-off Meeting' has been successfully created."
    );
}

#[tokio::test]
async fn test_create_event_requires_subject_and_times() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("POST", "/me/calendar/events")
        .expect(0)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_create_event(&ctx, "", None, None, None, None, None, None).await;

    assert_eq!(
        result,
        "Subject, start, and end times are required to create an event."
    );
    create.assert_async().await;
}

#[tokio::test]
async fn test_invalid_recurrence_fails_before_any_network_call() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("POST", "/me/calendar/events")
        .expect(0)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let recurrence = json!({
        "pattern": { "type": "weekly", "interval": 1 },
        "range": { "type": "noEnd", "startDate": "2024-03-10" }
    });
    let result = handle_create_event(
        &ctx,
        "Weekly Review",
        Some(&json!("2024-03-10T09:00:00")),
        Some(&json!("2024-03-10T10:00:00")),
        None,
        None,
        None,
        Some(&recurrence),
    )
    .await;

    assert!(result.starts_with("Invalid recurrence pattern:"));
    assert!(result.contains("daysOfWeek"));
    create.assert_async().await;
}

#[tokio::test]
async fn test_create_event_requires_authentication() {
    let mut server = mockito::Server::new_async().await;
    let ctx = unauthed_context(&server.url());

    let result = handle_create_event(
        &ctx,
        "Meeting",
        Some(&json!("2024-03-10T09:00:00")),
        Some(&json!("2024-03-10T10:00:00")),
        None,
        None,
        None,
        None,
    )
    .await;

    assert_eq!(
        result,
        "Authentication required. Please use the 'authenticate' tool first."
    );
}

#[tokio::test]
async fn test_accept_event_posts_to_accept_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let accept = server
        .mock("POST", "/me/events/event-123/accept")
        .match_body(Matcher::PartialJson(json!({ "sendResponse": true })))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_respond_to_event(&ctx, "event-123", "ACCEPT", None, true).await;

    assert!(result.contains("accepted successfully"));
    accept.assert_async().await;
}

#[tokio::test]
async fn test_tentative_response_with_comment() {
    let mut server = mockito::Server::new_async().await;
    let respond = server
        .mock("POST", "/me/events/event-123/tentativelyAccept")
        .match_body(Matcher::PartialJson(json!({
            "sendResponse": false,
            "comment": "Might be late"
        })))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result =
        handle_respond_to_event(&ctx, "event-123", "tentative", Some("Might be late"), false)
            .await;

    assert!(result.contains("tentatively accepted successfully"));
    assert!(result.contains("Might be late"));
    assert!(result.contains("Organizer was not notified"));
    respond.assert_async().await;
}

#[tokio::test]
async fn test_invalid_response_value_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let ctx = authed_context(&server.url());

    let result = handle_respond_to_event(&ctx, "event-123", "maybe", None, true).await;
    assert_eq!(
        result,
        "Invalid response 'maybe'. Must be one of: accept, decline, tentative"
    );

    let result = handle_respond_to_event(&ctx, "", "accept", None, true).await;
    assert_eq!(
        result,
        "Event ID is required. Use 'list-events' to find event IDs."
    );
}

#[tokio::test]
async fn test_respond_to_missing_event_reports_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/me/events/gone-event/decline")
        .with_status(404)
        .with_body(r#"{"error":{"code":"ErrorItemNotFound"}}"#)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_respond_to_event(&ctx, "gone-event", "decline", None, true).await;

    assert!(result.contains("Event not found"));
    assert!(result.contains("list-events"));
}

#[tokio::test]
async fn test_cancel_event_posts_comment() {
    let mut server = mockito::Server::new_async().await;
    let cancel = server
        .mock("POST", "/me/events/event-123/cancel")
        .match_body(Matcher::PartialJson(json!({ "comment": "Room unavailable" })))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_cancel_event(&ctx, "event-123", Some("Room unavailable")).await;

    assert_eq!(
        result,
        "Event cancelled successfully. Attendees have been notified."
    );
    cancel.assert_async().await;
}

#[tokio::test]
async fn test_delete_event_issues_delete() {
    let mut server = mockito::Server::new_async().await;
    let delete = server
        .mock("DELETE", "/me/events/event-123")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_delete_event(&ctx, "event-123").await;

    assert_eq!(result, "Event deleted successfully.");
    delete.assert_async().await;
}

#[tokio::test]
async fn test_list_calendars_formats_listing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/me/calendars")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "value": [
                    {
                        "id": "cal-1",
                        "name": "Calendar",
                        "isDefaultCalendar": true,
                        "owner": { "name": "Test User" },
                        "canEdit": true
                    },
                    { "id": "cal-2", "name": "Work Calendar" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_list_calendars(&ctx).await;

    assert!(result.starts_with("Found 2 calendars:"));
    assert!(result.contains("1. Calendar [DEFAULT] (Owner: Test User) - Permissions: edit"));
    assert!(result.contains("2. Work Calendar"));
    assert!(result.contains("ID: cal-1"));
}

#[tokio::test]
async fn test_list_events_defaults_to_thirty_day_window() {
    let mut server = mockito::Server::new_async().await;
    let view = server
        .mock("GET", "/me/calendar/calendarView")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("$top".into(), "10".into()),
            Matcher::UrlEncoded("$orderby".into(), "start/dateTime".into()),
            Matcher::Regex("startDateTime=".into()),
            Matcher::Regex("endDateTime=".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "value": [{
                    "id": "ev-1",
                    "subject": "Planning",
                    "start": { "dateTime": "2024-03-11T09:00:00", "timeZone": "UTC" },
                    "end": { "dateTime": "2024-03-11T10:00:00", "timeZone": "UTC" },
                    "location": { "displayName": "Room 4" },
                    "bodyPreview": "Quarterly planning"
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_list_events(&ctx, None, 10, None, None).await;

    assert!(result.starts_with("Found 1 events:"));
    assert!(result.contains("Planning"));
    assert!(result.contains("Location: Room 4"));
    assert!(result.contains("2024-03-11T09:00:00 (UTC)"));
    view.assert_async().await;
}

#[tokio::test]
async fn test_list_events_empty_window() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/me/calendar/calendarView")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":[]}"#)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_list_events(
        &ctx,
        None,
        10,
        Some("2024-03-10T00:00:00Z"),
        Some("2024-03-11T00:00:00Z"),
    )
    .await;

    assert_eq!(result, "No calendar events found.");
}
