//! Upstream mail/calendar provider contract.
//!
//! The sync orchestrator only depends on these traits and transient types;
//! any client honoring the shape is substitutable (tests use fixtures).

pub mod google;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected the request (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// One leaf or branch of a multi-part message body. `data` is base64url as
/// the provider delivers it; branches carry nested `parts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BodyPart {
    pub mime_type: String,
    pub data: Option<String>,
    pub parts: Vec<BodyPart>,
}

/// Provider-shaped raw message. Owned transiently by the sync orchestrator
/// for the duration of one pass; never persisted as-is.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender_name: Option<String>,
    pub sender_email: String,
    pub recipient_email: String,
    pub body: BodyPart,
    pub snippet: String,
    pub labels: Vec<String>,
    pub date_received: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    pub name: Option<String>,
    pub response_status: Option<String>,
    pub optional: bool,
}

/// Provider-shaped raw calendar event.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub id: String,
    pub calendar_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub timezone: Option<String>,
    pub is_all_day: bool,
    pub status: String,
    pub organizer_email: Option<String>,
    pub organizer_name: Option<String>,
    pub attendees: Vec<Attendee>,
    pub meeting_link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CalendarInfo {
    pub id: String,
    pub summary: String,
    pub primary: bool,
    pub selected: bool,
}

#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Searches messages matching `query`, returning full raw records.
    /// `include_spam` widens the search into the provider's spam folder.
    async fn search_messages(
        &self,
        query: &str,
        max_results: u32,
        include_spam: bool,
    ) -> Result<Vec<RawMessage>, ProviderError>;

    async fn mark_read(&self, message_id: &str) -> Result<(), ProviderError>;

    async fn archive(&self, message_id: &str) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, ProviderError>;

    /// Lists events of one calendar within `[time_min, time_max)`.
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, ProviderError>;
}
