//! Calendar tools: listing, creation (one-time and recurring), responses,
//! cancellation, and deletion, plus calendar-name resolution.

pub mod events;
pub mod list;
pub mod recurrence;
pub mod resolver;
pub mod respond;
