pub mod emails;
pub mod events;
pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Emails
        .route("/api/v1/emails", get(emails::list_emails))
        .route("/api/v1/emails/sync", post(emails::sync_emails_handler))
        .route("/api/v1/emails/:id", get(emails::get_email))
        .route(
            "/api/v1/emails/:id/status",
            put(emails::update_email_status),
        )
        // Calendar events
        .route("/api/v1/events", get(events::list_events))
        .route("/api/v1/events/upcoming", get(events::upcoming_events))
        .route("/api/v1/events/sync", post(events::sync_events_handler))
        .route("/api/v1/events/:id", get(events::get_event))
        .with_state(state)
}
