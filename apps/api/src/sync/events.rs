//! Calendar-event synchronization pass.
//!
//! Walks every calendar the account can see, classifies events inside the
//! sync window, and upserts through the `EventStore` seam. The pipeline is
//! the same as the email pass; events map onto it with the summary as the
//! subject and the organizer as the sender.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::classify::{ClassifyInput, MessageClassifier};
use crate::errors::AppError;
use crate::models::event::{EventStatus, EventType, NewEvent};
use crate::provider::{CalendarProvider, RawEvent};
use crate::sync::{SyncReport, WriteMode, FLUSH_EVERY};

/// Persistence seam for synced calendar events.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn contains(&self, id: &str) -> Result<bool>;

    async fn write(&self, batch: &[(NewEvent, WriteMode)]) -> Result<()>;
}

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT id FROM calendar_events WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn write(&self, batch: &[(NewEvent, WriteMode)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (event, mode) in batch {
            match mode {
                WriteMode::Insert => {
                    sqlx::query(
                        r#"
                        INSERT INTO calendar_events (
                            id, calendar_id, summary, description, location,
                            start_at, end_at, timezone, is_all_day, status,
                            event_type, is_hiring_related, confidence_score,
                            organizer_email, organizer_name, attendees,
                            meeting_link, company_name, job_title, notes,
                            synced_at, created_at, updated_at
                        )
                        VALUES (
                            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                            $12, $13, $14, $15, $16, $17, $18, $19, $20, $21,
                            now(), now()
                        )
                        ON CONFLICT (id) DO UPDATE SET
                            calendar_id = EXCLUDED.calendar_id,
                            summary = EXCLUDED.summary,
                            description = EXCLUDED.description,
                            location = EXCLUDED.location,
                            start_at = EXCLUDED.start_at,
                            end_at = EXCLUDED.end_at,
                            timezone = EXCLUDED.timezone,
                            is_all_day = EXCLUDED.is_all_day,
                            status = EXCLUDED.status,
                            event_type = EXCLUDED.event_type,
                            is_hiring_related = EXCLUDED.is_hiring_related,
                            confidence_score = EXCLUDED.confidence_score,
                            organizer_email = EXCLUDED.organizer_email,
                            organizer_name = EXCLUDED.organizer_name,
                            attendees = EXCLUDED.attendees,
                            meeting_link = EXCLUDED.meeting_link,
                            company_name = EXCLUDED.company_name,
                            job_title = EXCLUDED.job_title,
                            notes = EXCLUDED.notes,
                            synced_at = EXCLUDED.synced_at,
                            updated_at = now()
                        "#,
                    )
                    .bind(&event.id)
                    .bind(&event.calendar_id)
                    .bind(&event.summary)
                    .bind(&event.description)
                    .bind(&event.location)
                    .bind(event.start_at)
                    .bind(event.end_at)
                    .bind(&event.timezone)
                    .bind(event.is_all_day)
                    .bind(event.status)
                    .bind(event.event_type)
                    .bind(event.is_hiring_related)
                    .bind(event.confidence_score)
                    .bind(&event.organizer_email)
                    .bind(&event.organizer_name)
                    .bind(Json(&event.attendees))
                    .bind(&event.meeting_link)
                    .bind(&event.company_name)
                    .bind(&event.job_title)
                    .bind(Json(&event.notes))
                    .bind(event.synced_at)
                    .execute(&mut *tx)
                    .await?;
                }
                WriteMode::Refresh => {
                    sqlx::query(
                        r#"
                        UPDATE calendar_events SET
                            calendar_id = $2,
                            summary = $3,
                            description = $4,
                            location = $5,
                            start_at = $6,
                            end_at = $7,
                            timezone = $8,
                            is_all_day = $9,
                            status = $10,
                            event_type = $11,
                            is_hiring_related = $12,
                            confidence_score = $13,
                            organizer_email = $14,
                            organizer_name = $15,
                            attendees = $16,
                            meeting_link = $17,
                            company_name = $18,
                            job_title = $19,
                            notes = $20,
                            synced_at = $21,
                            updated_at = now()
                        WHERE id = $1
                        "#,
                    )
                    .bind(&event.id)
                    .bind(&event.calendar_id)
                    .bind(&event.summary)
                    .bind(&event.description)
                    .bind(&event.location)
                    .bind(event.start_at)
                    .bind(event.end_at)
                    .bind(&event.timezone)
                    .bind(event.is_all_day)
                    .bind(event.status)
                    .bind(event.event_type)
                    .bind(event.is_hiring_related)
                    .bind(event.confidence_score)
                    .bind(&event.organizer_email)
                    .bind(&event.organizer_name)
                    .bind(Json(&event.attendees))
                    .bind(&event.meeting_link)
                    .bind(&event.company_name)
                    .bind(&event.job_title)
                    .bind(Json(&event.notes))
                    .bind(event.synced_at)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

fn classify_input(event: &RawEvent) -> ClassifyInput {
    let mut body = event.description.clone().unwrap_or_default();
    if let Some(location) = &event.location {
        body.push(' ');
        body.push_str(location);
    }
    ClassifyInput {
        subject: event.summary.clone(),
        body_text: body,
        sender_email: event.organizer_email.clone().unwrap_or_default(),
        sender_name: event.organizer_name.clone(),
        labels: vec![],
    }
}

/// Runs one calendar sync pass over the window
/// `[now - days_back, now + days_forward)`.
pub async fn sync_events(
    provider: &dyn CalendarProvider,
    classifier: &MessageClassifier,
    store: &dyn EventStore,
    days_back: u32,
    days_forward: u32,
    force_refresh: bool,
) -> Result<SyncReport, AppError> {
    let now = Utc::now();
    let time_min = now - Duration::days(days_back as i64);
    let time_max = now + Duration::days(days_forward as i64);

    let calendars = provider.list_calendars().await?;
    info!(count = calendars.len(), "listing events across calendars");

    let mut report = SyncReport::default();
    let mut staged: Vec<(NewEvent, WriteMode)> = Vec::new();

    for calendar in calendars {
        let events = match provider.list_events(&calendar.id, time_min, time_max).await {
            Ok(events) => events,
            Err(e) => {
                warn!(calendar = %calendar.id, "listing events failed, skipping calendar: {e}");
                continue;
            }
        };

        for raw in events {
            let exists = match store.contains(&raw.id).await {
                Ok(exists) => exists,
                Err(e) => {
                    warn!(id = %raw.id, "existence check failed, skipping: {e}");
                    continue;
                }
            };
            if exists && !force_refresh {
                continue;
            }

            let result = classifier.classify(&classify_input(&raw)).await;

            let mut notes = result.key_details.clone();
            if let Some(next) = &result.next_action {
                notes.push(format!("Next action: {next}"));
            }

            let event = NewEvent {
                id: raw.id,
                calendar_id: raw.calendar_id,
                summary: raw.summary,
                description: raw.description,
                location: raw.location,
                start_at: raw.start_at,
                end_at: raw.end_at,
                timezone: raw.timezone,
                is_all_day: raw.is_all_day,
                status: EventStatus::from_provider(&raw.status),
                event_type: EventType::from_category(result.category, result.is_relevant),
                is_hiring_related: result.is_relevant,
                confidence_score: result.confidence,
                organizer_email: raw.organizer_email,
                organizer_name: raw.organizer_name,
                attendees: raw.attendees,
                meeting_link: raw.meeting_link,
                company_name: result.company_name,
                job_title: result.job_title,
                notes,
                synced_at: Utc::now(),
            };

            if exists {
                report.updated += 1;
                staged.push((event, WriteMode::Refresh));
            } else {
                report.synced += 1;
                staged.push((event, WriteMode::Insert));
            }

            if staged.len() >= FLUSH_EVERY {
                store.write(&staged).await?;
                staged.clear();
            }
        }
    }

    if !staged.is_empty() {
        store.write(&staged).await?;
    }

    info!(
        synced = report.synced,
        updated = report.updated,
        "calendar sync pass complete"
    );
    Ok(report)
}
