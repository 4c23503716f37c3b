use std::sync::Arc;

use sqlx::PgPool;

use crate::classify::MessageClassifier;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::provider::{CalendarProvider, MailProvider};

/// Shared application state, cloned per request by Axum.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    pub mail: Arc<dyn MailProvider>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub classifier: Arc<MessageClassifier>,
    pub config: Config,
}
