//! Email endpoints: listing, detail, status updates, and sync kickoff.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::errors::AppError;
use crate::models::email::{EmailCategory, EmailRow, EmailStatus};
use crate::state::AppState;
use crate::sync::emails::{sync_emails, PgEmailStore};

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct ListEmailsQuery {
    pub status: Option<EmailStatus>,
    pub category: Option<EmailCategory>,
    pub is_hiring_related: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// GET /api/v1/emails
pub async fn list_emails(
    State(state): State<AppState>,
    Query(query): Query<ListEmailsQuery>,
) -> Result<Json<Vec<EmailRow>>, AppError> {
    let limit = query.limit.clamp(1, 200);
    let offset = query.offset.max(0);

    let rows: Vec<EmailRow> = sqlx::query_as(
        r#"
        SELECT * FROM emails
        WHERE ($1::email_status IS NULL OR status = $1)
          AND ($2::email_category IS NULL OR category = $2)
          AND ($3::boolean IS NULL OR is_hiring_related = $3)
        ORDER BY date_received DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(query.status)
    .bind(query.category)
    .bind(query.is_hiring_related)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

/// GET /api/v1/emails/:id
pub async fn get_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EmailRow>, AppError> {
    let row: Option<EmailRow> = sqlx::query_as("SELECT * FROM emails WHERE id = $1")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;

    row.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("email '{id}' not found")))
}

fn default_days_back() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
pub struct SyncEmailsQuery {
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    #[serde(default)]
    pub force_refresh: bool,
}

/// POST /api/v1/emails/sync
///
/// Kicks the sync pass off in the background and returns immediately; a pass
/// can take minutes when the AI stage is busy.
pub async fn sync_emails_handler(
    State(state): State<AppState>,
    Query(query): Query<SyncEmailsQuery>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if query.days_back == 0 || query.days_back > 365 {
        return Err(AppError::Validation(
            "days_back must be between 1 and 365".to_string(),
        ));
    }

    let mail = state.mail.clone();
    let classifier = state.classifier.clone();
    let store = PgEmailStore::new(state.db.clone());
    let days_back = query.days_back;
    let force_refresh = query.force_refresh;

    tokio::spawn(async move {
        match sync_emails(mail.as_ref(), &classifier, &store, days_back, force_refresh).await {
            Ok(report) => {
                tracing::info!(
                    synced = report.synced,
                    updated = report.updated,
                    "background email sync finished"
                );
            }
            Err(e) => error!("background email sync failed: {e}"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Email sync started",
            "days_back": query.days_back,
            "force_refresh": query.force_refresh
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: EmailStatus,
}

/// PUT /api/v1/emails/:id/status
///
/// Status is user-owned state; this is its only write path. Read/archive
/// transitions are mirrored to the provider on a best-effort basis.
pub async fn update_email_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<EmailRow>, AppError> {
    let row: Option<EmailRow> = sqlx::query_as(
        "UPDATE emails SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(&id)
    .bind(body.status)
    .fetch_optional(&state.db)
    .await?;

    let row = row.ok_or_else(|| AppError::NotFound(format!("email '{id}' not found")))?;

    // Provider mirroring is best-effort; local state is the source of truth.
    match body.status {
        EmailStatus::Read => {
            if let Err(e) = state.mail.mark_read(&id).await {
                warn!(id = %id, "failed to mark message read at provider: {e}");
            }
        }
        EmailStatus::Archived => {
            if let Err(e) = state.mail.archive(&id).await {
                warn!(id = %id, "failed to archive message at provider: {e}");
            }
        }
        EmailStatus::Unread | EmailStatus::Discarded => {}
    }

    Ok(Json(row))
}
