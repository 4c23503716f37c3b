//! Calendar-event endpoints: listing, upcoming view, and sync kickoff.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::errors::AppError;
use crate::models::event::{EventRow, EventType};
use crate::state::AppState;
use crate::sync::events::{sync_events, PgEventStore};

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub event_type: Option<EventType>,
    pub is_hiring_related: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// GET /api/v1/events
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<EventRow>>, AppError> {
    let limit = query.limit.clamp(1, 200);
    let offset = query.offset.max(0);

    let rows: Vec<EventRow> = sqlx::query_as(
        r#"
        SELECT * FROM calendar_events
        WHERE ($1::event_type IS NULL OR event_type = $1)
          AND ($2::boolean IS NULL OR is_hiring_related = $2)
        ORDER BY start_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(query.event_type)
    .bind(query.is_hiring_related)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

fn default_upcoming_days() -> u32 {
    7
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    #[serde(default = "default_upcoming_days")]
    pub days: u32,
}

/// GET /api/v1/events/upcoming
///
/// Hiring-related events starting within the next `days` days, soonest first.
pub async fn upcoming_events(
    State(state): State<AppState>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<EventRow>>, AppError> {
    if query.days == 0 || query.days > 365 {
        return Err(AppError::Validation(
            "days must be between 1 and 365".to_string(),
        ));
    }

    let now = Utc::now();
    let until = now + Duration::days(query.days as i64);

    let rows: Vec<EventRow> = sqlx::query_as(
        r#"
        SELECT * FROM calendar_events
        WHERE is_hiring_related = true
          AND start_at >= $1
          AND start_at < $2
        ORDER BY start_at ASC
        "#,
    )
    .bind(now)
    .bind(until)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

/// GET /api/v1/events/:id
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EventRow>, AppError> {
    let row: Option<EventRow> = sqlx::query_as("SELECT * FROM calendar_events WHERE id = $1")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;

    row.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("event '{id}' not found")))
}

fn default_days_back() -> u32 {
    30
}

fn default_days_forward() -> u32 {
    60
}

#[derive(Debug, Deserialize)]
pub struct SyncEventsQuery {
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    #[serde(default = "default_days_forward")]
    pub days_forward: u32,
    #[serde(default)]
    pub force_refresh: bool,
}

/// POST /api/v1/events/sync
pub async fn sync_events_handler(
    State(state): State<AppState>,
    Query(query): Query<SyncEventsQuery>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if query.days_back == 0 || query.days_back > 365 || query.days_forward > 365 {
        return Err(AppError::Validation(
            "days_back and days_forward must be between 1 and 365".to_string(),
        ));
    }

    let calendar = state.calendar.clone();
    let classifier = state.classifier.clone();
    let store = PgEventStore::new(state.db.clone());
    let (days_back, days_forward, force_refresh) =
        (query.days_back, query.days_forward, query.force_refresh);

    tokio::spawn(async move {
        match sync_events(
            calendar.as_ref(),
            &classifier,
            &store,
            days_back,
            days_forward,
            force_refresh,
        )
        .await
        {
            Ok(report) => {
                tracing::info!(
                    synced = report.synced,
                    updated = report.updated,
                    "background calendar sync finished"
                );
            }
            Err(e) => error!("background calendar sync failed: {e}"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Calendar sync started",
            "days_back": query.days_back,
            "days_forward": query.days_forward,
            "force_refresh": query.force_refresh
        })),
    ))
}
