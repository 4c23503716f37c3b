//! Persisted calendar-event rows, keyed by the provider-assigned event id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::models::email::EmailCategory;
use crate::provider::Attendee;

/// Provider-sourced event status (confirmed/tentative/cancelled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    /// Maps the provider's free-text status. Unknown strings fall back to
    /// `Confirmed`, matching the provider's own default.
    pub fn from_provider(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "tentative" => EventStatus::Tentative,
            "cancelled" => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Interview,
    Meeting,
    Call,
    Deadline,
    Networking,
    Conference,
    Other,
}

impl EventType {
    /// Derives the event type from the classification outcome. Total mapping:
    /// every category lands somewhere, irrelevant events land on `Other`.
    pub fn from_category(category: EmailCategory, is_hiring_related: bool) -> Self {
        if !is_hiring_related {
            return EventType::Other;
        }
        match category {
            EmailCategory::InterviewInvitation => EventType::Interview,
            EmailCategory::RecruiterOutreach => EventType::Networking,
            EmailCategory::FollowUp => EventType::Call,
            EmailCategory::Other => EventType::Other,
            _ => EventType::Meeting,
        }
    }
}

/// Full row as stored in the `calendar_events` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EventRow {
    /// Provider event id (primary key).
    pub id: String,
    pub calendar_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub timezone: Option<String>,
    pub is_all_day: bool,
    pub status: EventStatus,
    pub event_type: EventType,
    pub is_hiring_related: bool,
    pub confidence_score: f64,
    pub organizer_email: Option<String>,
    pub organizer_name: Option<String>,
    pub attendees: Json<Vec<Attendee>>,
    pub meeting_link: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub notes: Json<Vec<String>>,
    pub synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sync-owned field set for calendar events (same contract as `NewEmail`).
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub id: String,
    pub calendar_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub timezone: Option<String>,
    pub is_all_day: bool,
    pub status: EventStatus,
    pub event_type: EventType,
    pub is_hiring_related: bool,
    pub confidence_score: f64,
    pub organizer_email: Option<String>,
    pub organizer_name: Option<String>,
    pub attendees: Vec<Attendee>,
    pub meeting_link: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub notes: Vec<String>,
    pub synced_at: DateTime<Utc>,
}
