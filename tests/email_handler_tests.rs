/// Email Handler Tests Module
///
/// End-to-end tests for the email tool handlers against a mock Graph API
/// server: listing, reading, sending, read-state updates, and drafts.
use mcp_outlookcal::auth::TokenManager;
use mcp_outlookcal::config::Config;
use mcp_outlookcal::context::OutlookContext;
use mcp_outlookcal::email::drafts::{handle_save_draft, handle_send_draft};
use mcp_outlookcal::email::list::{handle_list_emails, handle_read_email};
use mcp_outlookcal::email::search::{handle_search_emails, SearchCriteria};
use mcp_outlookcal::email::send::{handle_mark_as_read, handle_send_email};
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

#[tokio::test]
async fn test_list_emails_defaults_to_inbox() {
    let mut server = mockito::Server::new_async().await;
    let listing = server
        .mock("GET", "/me/mailFolders/inbox/messages")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("$top".into(), "5".into()),
            Matcher::UrlEncoded("$orderby".into(), "receivedDateTime desc".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "value": [
                    {
                        "id": "msg-1",
                        "subject": "Status Update",
                        "from": { "emailAddress": { "name": "Alice", "address": "alice@example.com" } },
                        "receivedDateTime": "2024-03-10T08:00:00Z",
                        "bodyPreview": "Here is the latest",
                        "isRead": false,
                        "hasAttachments": true
                    },
                    {
                        "id": "msg-2",
                        "subject": "Lunch?",
                        "from": { "emailAddress": { "address": "bob@example.com" } },
                        "receivedDateTime": "2024-03-09T12:00:00Z",
                        "bodyPreview": "Thai place",
                        "isRead": true,
                        "hasAttachments": false
                    }
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_list_emails(&ctx, None, 5).await;

    assert!(result.starts_with("Found 2 emails in 'inbox':"));
    assert!(result.contains("1. Status Update [UNREAD] [ATTACHMENTS]"));
    assert!(result.contains("2. Lunch?"));
    assert!(!result.contains("2. Lunch? [UNREAD]"));
    listing.assert_async().await;
}

#[tokio::test]
async fn test_list_emails_unknown_folder() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/me/mailFolders/nosuchfolder/messages")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":"ErrorFolderNotFound"}}"#)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_list_emails(&ctx, Some("NoSuchFolder"), 5).await;

    assert!(result.contains("Folder 'NoSuchFolder' not found"));
}

#[tokio::test]
async fn test_search_emails_with_free_text_query() {
    let mut server = mockito::Server::new_async().await;
    let search = server
        .mock("GET", "/me/mailFolders/inbox/messages")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("$search".into(), "\"project update\"".into()),
            Matcher::UrlEncoded("$top".into(), "10".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "value": [{
                    "id": "msg-7",
                    "subject": "Project update for Q2",
                    "from": { "emailAddress": { "address": "alice@example.com" } },
                    "receivedDateTime": "2024-03-10T08:00:00Z",
                    "bodyPreview": "Latest numbers attached",
                    "isRead": true,
                    "hasAttachments": true
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_search_emails(
        &ctx,
        Some("project update"),
        None,
        &SearchCriteria::default(),
        10,
    )
    .await;

    assert!(result.starts_with("Found 1 matching emails:"));
    assert!(result.contains("Project update for Q2"));
    search.assert_async().await;
}

#[tokio::test]
async fn test_search_emails_builds_structured_filter() {
    let mut server = mockito::Server::new_async().await;
    let search = server
        .mock("GET", "/me/mailFolders/sentitems/messages")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "$filter".into(),
                "(contains(from/emailAddress/address,'alice@example.com') or \
                 contains(from/emailAddress/name,'alice@example.com')) and isRead eq false"
                    .into(),
            ),
            Matcher::UrlEncoded("$orderby".into(), "receivedDateTime desc".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let criteria = SearchCriteria {
        from: Some("alice@example.com"),
        unread_only: true,
        ..Default::default()
    };
    let result =
        handle_search_emails(&ctx, None, Some("sentitems"), &criteria, 10).await;

    assert_eq!(result, "No emails found matching your search.");
    search.assert_async().await;
}

#[tokio::test]
async fn test_search_emails_escapes_filter_quotes() {
    let mut server = mockito::Server::new_async().await;
    let search = server
        .mock("GET", "/me/mailFolders/inbox/messages")
        .match_query(Matcher::UrlEncoded(
            "$filter".into(),
            "contains(subject,'O''Brien''s report')".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let criteria = SearchCriteria {
        subject: Some("O'Brien's report"),
        ..Default::default()
    };
    let result = handle_search_emails(&ctx, None, None, &criteria, 10).await;

    assert_eq!(result, "No emails found matching your search.");
    search.assert_async().await;
}

#[tokio::test]
async fn test_search_emails_requires_some_criterion() {
    let mut server = mockito::Server::new_async().await;
    let search = server
        .mock("GET", "/me/mailFolders/inbox/messages")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result =
        handle_search_emails(&ctx, None, None, &SearchCriteria::default(), 10).await;

    assert!(result.starts_with("At least one search criterion"));
    search.assert_async().await;
}

#[tokio::test]
async fn test_read_email_renders_full_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/me/messages/msg-1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "msg-1",
                "subject": "Status Update",
                "from": { "emailAddress": { "name": "Alice", "address": "alice@example.com" } },
                "toRecipients": [
                    { "emailAddress": { "address": "me@example.com" } }
                ],
                "receivedDateTime": "2024-03-10T08:00:00Z",
                "body": { "contentType": "text", "content": "Here is the full report." }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_read_email(&ctx, "msg-1").await;

    assert!(result.starts_with("Subject: Status Update"));
    assert!(result.contains("Alice"));
    assert!(result.contains("me@example.com"));
    assert!(result.contains("Here is the full report."));
}

#[tokio::test]
async fn test_read_missing_email_reports_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/me/messages/gone")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":"ErrorItemNotFound"}}"#)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_read_email(&ctx, "gone").await;

    assert!(result.contains("Email not found"));
    assert!(result.contains("list-emails"));
}

#[tokio::test]
async fn test_send_email_posts_send_mail_payload() {
    let mut server = mockito::Server::new_async().await;
    let send = server
        .mock("POST", "/me/sendMail")
        .match_body(Matcher::PartialJson(json!({
            "message": {
                "subject": "Hello",
                "body": { "contentType": "text", "content": "Hi there" },
                "toRecipients": [
                    { "emailAddress": { "address": "alice@example.com" } },
                    { "emailAddress": { "address": "bob@example.com" } }
                ],
                "ccRecipients": [
                    { "emailAddress": { "address": "carol@example.com" } }
                ],
                "importance": "high"
            },
            "saveToSentItems": true
        })))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_send_email(
        &ctx,
        "alice@example.com, bob@example.com",
        Some("carol@example.com"),
        None,
        "Hello",
        "Hi there",
        None,
        Some("high"),
        true,
    )
    .await;

    assert_eq!(result, "Email 'Hello' sent successfully.");
    send.assert_async().await;
}

#[tokio::test]
async fn test_send_email_requires_to_subject_body() {
    let mut server = mockito::Server::new_async().await;
    let send = server
        .mock("POST", "/me/sendMail")
        .expect(0)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result =
        handle_send_email(&ctx, "", None, None, "Hello", "Hi", None, None, true).await;

    assert_eq!(result, "To, subject, and body are required to send an email.");
    send.assert_async().await;
}

#[tokio::test]
async fn test_mark_as_read_patches_flag() {
    let mut server = mockito::Server::new_async().await;
    let patch = server
        .mock("PATCH", "/me/messages/msg-1")
        .match_body(Matcher::Json(json!({ "isRead": true })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"msg-1","isRead":true}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_mark_as_read(&ctx, "msg-1", true).await;
    assert_eq!(result, "Email marked as read.");
    patch.assert_async().await;
}

#[tokio::test]
async fn test_save_new_draft() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("POST", "/me/messages")
        .match_body(Matcher::PartialJson(json!({
            "subject": "Draft subject",
            "body": { "contentType": "text", "content": "Draft body" },
            "toRecipients": [
                { "emailAddress": { "address": "alice@example.com" } }
            ],
            // New drafts get an explicit default importance
            "importance": "normal"
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"draft-1","subject":"Draft subject"}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_save_draft(
        &ctx,
        None,
        Some("alice@example.com"),
        None,
        None,
        Some("Draft subject"),
        Some("Draft body"),
        None,
        None,
    )
    .await;

    assert!(result.starts_with("Draft created successfully!"));
    assert!(result.contains("Draft ID: draft-1"));
    assert!(result.contains("To: 1 recipient(s)"));
    create.assert_async().await;
}

#[tokio::test]
async fn test_update_draft_sends_only_provided_fields() {
    let mut server = mockito::Server::new_async().await;
    let patch = server
        .mock("PATCH", "/me/messages/draft-1")
        .match_body(Matcher::Json(json!({ "subject": "New subject" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"draft-1","subject":"New subject"}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_save_draft(
        &ctx,
        Some("draft-1"),
        None,
        None,
        None,
        Some("New subject"),
        None,
        None,
        None,
    )
    .await;

    assert!(result.starts_with("Draft updated successfully!"));
    patch.assert_async().await;
}

#[tokio::test]
async fn test_update_draft_with_no_fields_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let ctx = authed_context(&server.url());

    let result = handle_save_draft(
        &ctx,
        Some("draft-1"),
        None,
        None,
        None,
        None,
        None,
        None,
        None,
    )
    .await;

    assert!(result.starts_with("At least one field"));
    assert!(result.contains("updating a draft"));
}

#[tokio::test]
async fn test_send_draft_fetches_then_sends() {
    let mut server = mockito::Server::new_async().await;
    let fetch = server
        .mock("GET", "/me/messages/draft-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "draft-1",
                "subject": "Draft subject",
                "toRecipients": [
                    { "emailAddress": { "address": "alice@example.com" } }
                ],
                "ccRecipients": [
                    { "emailAddress": { "address": "carol@example.com" } }
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let send = server
        .mock("POST", "/me/messages/draft-1/send")
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_send_draft(&ctx, "draft-1").await;

    assert!(result.starts_with("Draft sent successfully!"));
    assert!(result.contains("Subject: Draft subject"));
    assert!(result.contains("Recipients: 1 + 1 CC"));
    fetch.assert_async().await;
    send.assert_async().await;
}

#[tokio::test]
async fn test_send_missing_draft_reports_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/me/messages/gone-draft")
        .with_status(404)
        .with_body(r#"{"error":{"code":"ErrorItemNotFound"}}"#)
        .create_async()
        .await;

    let ctx = authed_context(&server.url());
    let result = handle_send_draft(&ctx, "gone-draft").await;

    assert!(result.contains("Draft not found"));
    assert!(result.contains("drafts"));
}
