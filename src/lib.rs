/// Outlook MCP Server Implementation
///
/// This crate provides an MCP (Model Context Protocol) server for Outlook,
/// allowing an agent to work with mail and calendar data through the
/// Microsoft Graph API.
///
/// # Features
///
/// - List, create, respond to, cancel, and delete calendar events,
///   including recurring events
/// - Resolve calendars by display name with a process-wide cache
/// - List, read, and send emails; manage drafts
/// - OAuth2 token lifecycle with encrypted on-disk persistence
///
/// # Testing
///
/// The crate includes unit tests for the validation and request-shaping
/// logic and integration tests that exercise the tool handlers against a
/// mock Graph API server.
pub mod auth;
pub mod calendar;
pub mod config;
pub mod context;
pub mod email;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod oauth;
pub mod server;
pub mod token_storage;

pub use crate::config::Config;
pub use crate::context::OutlookContext;
pub use crate::logging::setup_logging;
pub use crate::server::OutlookServer;
