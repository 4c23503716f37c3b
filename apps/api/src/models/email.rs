//! Persisted email rows. Keyed by the provider-assigned message id — the sole
//! key used for idempotent upsert. Never generated locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// User-owned lifecycle state. Sync sets this to `Unread` on first sight and
/// never touches it again (see the sync-owned vs user-owned split in sync/).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "email_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Unread,
    Read,
    Discarded,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "email_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmailPriority {
    Low,
    Medium,
    High,
}

/// Coarse hiring category assigned by the classification pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "email_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmailCategory {
    JobApplication,
    InterviewInvitation,
    Rejection,
    Offer,
    RecruiterOutreach,
    FollowUp,
    Other,
}

/// Full row as stored in the `emails` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmailRow {
    /// Provider message id (primary key).
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender_name: Option<String>,
    pub sender_email: String,
    pub recipient_email: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub date_received: DateTime<Utc>,
    pub status: EmailStatus,
    pub priority: EmailPriority,
    pub category: EmailCategory,
    pub is_hiring_related: bool,
    pub confidence_score: f64,
    pub labels: Json<Vec<String>>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub notes: Json<Vec<String>>,
    pub synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sync-owned field set written by the orchestrator. Deliberately excludes
/// `status`: inserts default it to `unread`, refreshes leave it alone.
#[derive(Debug, Clone)]
pub struct NewEmail {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender_name: Option<String>,
    pub sender_email: String,
    pub recipient_email: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub date_received: DateTime<Utc>,
    pub priority: EmailPriority,
    pub category: EmailCategory,
    pub is_hiring_related: bool,
    pub confidence_score: f64,
    pub labels: Vec<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub notes: Vec<String>,
    pub synced_at: DateTime<Utc>,
}
