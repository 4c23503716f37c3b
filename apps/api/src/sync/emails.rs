//! Email synchronization pass.
//!
//! Pulls recent hiring-adjacent messages from the mail provider, classifies
//! each one, and upserts the results through the `EmailStore` seam. `status`
//! is user-owned: inserts default it to `unread`, refreshes never touch it.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::classify::{normalize, ClassifyInput, MessageClassifier};
use crate::errors::AppError;
use crate::models::email::NewEmail;
use crate::provider::MailProvider;
use crate::sync::{SyncReport, WriteMode, FLUSH_EVERY};

/// Provider-side cap per sync pass.
const MAX_RESULTS: u32 = 200;

/// OR-joined terms that pre-filter the provider search to hiring-adjacent
/// mail. Deliberately broad; the classifier does the real filtering.
const SEARCH_TERMS: &[&str] = &[
    "interview",
    "job",
    "recruiter",
    "application",
    "offer",
    "position",
    "hiring",
    "opportunity",
    "career",
];

pub fn build_search_query(days_back: u32) -> String {
    format!("({}) newer_than:{}d", SEARCH_TERMS.join(" OR "), days_back)
}

/// Persistence seam for synced emails.
#[async_trait]
pub trait EmailStore: Send + Sync {
    async fn contains(&self, id: &str) -> Result<bool>;

    /// Applies one staged batch atomically.
    async fn write(&self, batch: &[(NewEmail, WriteMode)]) -> Result<()>;
}

pub struct PgEmailStore {
    pool: PgPool,
}

impl PgEmailStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailStore for PgEmailStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM emails WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn write(&self, batch: &[(NewEmail, WriteMode)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (email, mode) in batch {
            match mode {
                WriteMode::Insert => {
                    sqlx::query(
                        r#"
                        INSERT INTO emails (
                            id, thread_id, subject, sender_name, sender_email,
                            recipient_email, body_text, body_html, date_received,
                            status, priority, category, is_hiring_related,
                            confidence_score, labels, company_name, job_title,
                            notes, synced_at, created_at, updated_at
                        )
                        VALUES (
                            $1, $2, $3, $4, $5, $6, $7, $8, $9,
                            'unread', $10, $11, $12, $13, $14, $15, $16, $17, $18,
                            now(), now()
                        )
                        ON CONFLICT (id) DO UPDATE SET
                            thread_id = EXCLUDED.thread_id,
                            subject = EXCLUDED.subject,
                            sender_name = EXCLUDED.sender_name,
                            sender_email = EXCLUDED.sender_email,
                            recipient_email = EXCLUDED.recipient_email,
                            body_text = EXCLUDED.body_text,
                            body_html = EXCLUDED.body_html,
                            date_received = EXCLUDED.date_received,
                            priority = EXCLUDED.priority,
                            category = EXCLUDED.category,
                            is_hiring_related = EXCLUDED.is_hiring_related,
                            confidence_score = EXCLUDED.confidence_score,
                            labels = EXCLUDED.labels,
                            company_name = EXCLUDED.company_name,
                            job_title = EXCLUDED.job_title,
                            notes = EXCLUDED.notes,
                            synced_at = EXCLUDED.synced_at,
                            updated_at = now()
                        "#,
                    )
                    .bind(&email.id)
                    .bind(&email.thread_id)
                    .bind(&email.subject)
                    .bind(&email.sender_name)
                    .bind(&email.sender_email)
                    .bind(&email.recipient_email)
                    .bind(&email.body_text)
                    .bind(&email.body_html)
                    .bind(email.date_received)
                    .bind(email.priority)
                    .bind(email.category)
                    .bind(email.is_hiring_related)
                    .bind(email.confidence_score)
                    .bind(Json(&email.labels))
                    .bind(&email.company_name)
                    .bind(&email.job_title)
                    .bind(Json(&email.notes))
                    .bind(email.synced_at)
                    .execute(&mut *tx)
                    .await?;
                }
                WriteMode::Refresh => {
                    // Rewrites sync-owned fields only; `status` stays as the
                    // user left it.
                    sqlx::query(
                        r#"
                        UPDATE emails SET
                            thread_id = $2,
                            subject = $3,
                            sender_name = $4,
                            sender_email = $5,
                            recipient_email = $6,
                            body_text = $7,
                            body_html = $8,
                            date_received = $9,
                            priority = $10,
                            category = $11,
                            is_hiring_related = $12,
                            confidence_score = $13,
                            labels = $14,
                            company_name = $15,
                            job_title = $16,
                            notes = $17,
                            synced_at = $18,
                            updated_at = now()
                        WHERE id = $1
                        "#,
                    )
                    .bind(&email.id)
                    .bind(&email.thread_id)
                    .bind(&email.subject)
                    .bind(&email.sender_name)
                    .bind(&email.sender_email)
                    .bind(&email.recipient_email)
                    .bind(&email.body_text)
                    .bind(&email.body_html)
                    .bind(email.date_received)
                    .bind(email.priority)
                    .bind(email.category)
                    .bind(email.is_hiring_related)
                    .bind(email.confidence_score)
                    .bind(Json(&email.labels))
                    .bind(&email.company_name)
                    .bind(&email.job_title)
                    .bind(Json(&email.notes))
                    .bind(email.synced_at)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Runs one email sync pass.
pub async fn sync_emails(
    provider: &dyn MailProvider,
    classifier: &MessageClassifier,
    store: &dyn EmailStore,
    days_back: u32,
    force_refresh: bool,
) -> Result<SyncReport, AppError> {
    let query = build_search_query(days_back);
    // Spam is fetched too: the classifier records the verdict instead of the
    // provider silently hiding the message.
    let messages = provider
        .search_messages(&query, MAX_RESULTS, true)
        .await?;
    info!(count = messages.len(), "fetched messages for sync");

    let mut report = SyncReport::default();
    let mut staged: Vec<(NewEmail, WriteMode)> = Vec::new();

    for msg in messages {
        let exists = match store.contains(&msg.id).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(id = %msg.id, "existence check failed, skipping: {e}");
                continue;
            }
        };
        if exists && !force_refresh {
            continue;
        }

        let content = normalize::extract_content(&msg.body, &msg.snippet);
        let input = ClassifyInput {
            subject: msg.subject.clone(),
            body_text: content.text.clone(),
            sender_email: msg.sender_email.clone(),
            sender_name: msg.sender_name.clone(),
            labels: msg.labels.clone(),
        };
        let result = classifier.classify(&input).await;

        let mut notes = result.key_details.clone();
        if let Some(next) = &result.next_action {
            notes.push(format!("Next action: {next}"));
        }

        let email = NewEmail {
            id: msg.id.clone(),
            thread_id: msg.thread_id,
            subject: msg.subject,
            sender_name: msg.sender_name,
            sender_email: msg.sender_email,
            recipient_email: msg.recipient_email,
            body_text: (!content.text.is_empty()).then_some(content.text),
            body_html: (!content.html.is_empty()).then_some(content.html),
            date_received: msg.date_received,
            priority: result.priority,
            category: result.category,
            is_hiring_related: result.is_relevant,
            confidence_score: result.confidence,
            labels: msg.labels,
            company_name: result.company_name,
            job_title: result.job_title,
            notes,
            synced_at: Utc::now(),
        };

        if exists {
            report.updated += 1;
            staged.push((email, WriteMode::Refresh));
        } else {
            report.synced += 1;
            staged.push((email, WriteMode::Insert));
        }

        if staged.len() >= FLUSH_EVERY {
            store.write(&staged).await?;
            staged.clear();
        }
    }

    if !staged.is_empty() {
        store.write(&staged).await?;
    }

    info!(
        synced = report.synced,
        updated = report.updated,
        "email sync pass complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use base64::engine::general_purpose::URL_SAFE;
    use base64::Engine;

    use crate::classify::ai::{AiAnalysis, AiAnalyzer, AiOutcome};
    use crate::models::email::{EmailCategory, EmailStatus};
    use crate::provider::{BodyPart, ProviderError, RawMessage};

    struct FakeAnalyzer;

    #[async_trait]
    impl AiAnalyzer for FakeAnalyzer {
        async fn analyze(&self, _s: &str, _e: &str, _b: &str) -> AiOutcome {
            let mut a = AiAnalysis::degraded_default();
            a.is_hiring_related = Some(true);
            a.confidence = 0.9;
            a.category = Some(EmailCategory::InterviewInvitation);
            a.company_name = Some("Acme Corp".to_string());
            AiOutcome::Analyzed(a)
        }
    }

    struct FakeMail {
        messages: Vec<RawMessage>,
        last_query: Mutex<Option<String>>,
    }

    #[async_trait]
    impl MailProvider for FakeMail {
        async fn search_messages(
            &self,
            query: &str,
            _max_results: u32,
            _include_spam: bool,
        ) -> Result<Vec<RawMessage>, ProviderError> {
            *self.last_query.lock().unwrap() = Some(query.to_string());
            Ok(self.messages.clone())
        }

        async fn mark_read(&self, _id: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn archive(&self, _id: &str) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    #[derive(Clone)]
    struct StoredEmail {
        email: NewEmail,
        status: EmailStatus,
    }

    #[derive(Default)]
    struct MemStore {
        rows: Mutex<HashMap<String, StoredEmail>>,
        write_calls: AtomicUsize,
    }

    #[async_trait]
    impl EmailStore for MemStore {
        async fn contains(&self, id: &str) -> Result<bool> {
            Ok(self.rows.lock().unwrap().contains_key(id))
        }

        async fn write(&self, batch: &[(NewEmail, WriteMode)]) -> Result<()> {
            self.write_calls.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            for (email, mode) in batch {
                match mode {
                    WriteMode::Insert => {
                        rows.insert(
                            email.id.clone(),
                            StoredEmail {
                                email: email.clone(),
                                status: EmailStatus::Unread,
                            },
                        );
                    }
                    WriteMode::Refresh => {
                        if let Some(existing) = rows.get_mut(&email.id) {
                            existing.email = email.clone();
                            // status untouched by design of the Refresh mode
                        }
                    }
                }
            }
            Ok(())
        }
    }

    fn message(id: &str) -> RawMessage {
        let text = "We reviewed your application and would like to schedule an \
            interview. Could we set up a call next week to discuss?";
        RawMessage {
            id: id.to_string(),
            thread_id: format!("t-{id}"),
            subject: "Interview invitation".to_string(),
            sender_name: Some("Jane Doe".to_string()),
            sender_email: "jane@acmecorp.com".to_string(),
            recipient_email: "me@example.com".to_string(),
            body: BodyPart {
                mime_type: "text/plain".to_string(),
                data: Some(URL_SAFE.encode(text)),
                parts: vec![],
            },
            snippet: String::new(),
            labels: vec!["INBOX".to_string()],
            date_received: Utc::now(),
        }
    }

    fn provider_with(n: usize) -> FakeMail {
        FakeMail {
            messages: (0..n).map(|i| message(&format!("m{i}"))).collect(),
            last_query: Mutex::new(None),
        }
    }

    fn classifier() -> MessageClassifier {
        MessageClassifier::new(Arc::new(FakeAnalyzer))
    }

    #[tokio::test]
    async fn test_first_pass_inserts_everything() {
        let provider = provider_with(3);
        let store = MemStore::default();
        let report = sync_emails(&provider, &classifier(), &store, 30, false)
            .await
            .unwrap();
        assert_eq!(report.synced, 3);
        assert_eq!(report.updated, 0);

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.len(), 3);
        let stored = &rows["m0"];
        assert_eq!(stored.status, EmailStatus::Unread);
        assert!(stored.email.is_hiring_related);
        assert_eq!(stored.email.category, EmailCategory::InterviewInvitation);
        assert_eq!(stored.email.company_name.as_deref(), Some("Acme Corp"));
    }

    #[tokio::test]
    async fn test_search_query_includes_recency_window() {
        let provider = provider_with(0);
        let store = MemStore::default();
        sync_emails(&provider, &classifier(), &store, 14, false)
            .await
            .unwrap();
        let query = provider.last_query.lock().unwrap().clone().unwrap();
        assert!(query.contains("newer_than:14d"));
        assert!(query.contains("interview OR"));
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let provider = provider_with(3);
        let store = MemStore::default();
        let classifier = classifier();
        sync_emails(&provider, &classifier, &store, 30, false)
            .await
            .unwrap();
        let writes_after_first = store.write_calls.load(Ordering::SeqCst);

        let report = sync_emails(&provider, &classifier, &store, 30, false)
            .await
            .unwrap();
        assert_eq!(report.synced, 0);
        assert_eq!(report.updated, 0);
        assert_eq!(store.write_calls.load(Ordering::SeqCst), writes_after_first);
    }

    #[tokio::test]
    async fn test_force_refresh_rewrites_but_preserves_status() {
        let provider = provider_with(2);
        let store = MemStore::default();
        let classifier = classifier();
        sync_emails(&provider, &classifier, &store, 30, false)
            .await
            .unwrap();
        let old_synced_at = {
            let mut rows = store.rows.lock().unwrap();
            rows.get_mut("m0").unwrap().status = EmailStatus::Read;
            rows["m0"].email.synced_at
        };

        let report = sync_emails(&provider, &classifier, &store, 30, true)
            .await
            .unwrap();
        assert_eq!(report.synced, 0);
        assert_eq!(report.updated, 2);

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows["m0"].status, EmailStatus::Read);
        assert!(rows["m0"].email.synced_at >= old_synced_at);
    }

    #[tokio::test]
    async fn test_writes_flush_in_batches_of_ten() {
        let provider = provider_with(25);
        let store = MemStore::default();
        let report = sync_emails(&provider, &classifier(), &store, 30, false)
            .await
            .unwrap();
        assert_eq!(report.synced, 25);
        // 10 + 10 + final 5
        assert_eq!(store.write_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_spam_message_is_stored_with_spam_verdict() {
        let mut spam = message("spam0");
        spam.subject = "CONGRATULATIONS YOU HAVE WON!!!".to_string();
        spam.sender_email = "noreply@tempmail.com".to_string();
        spam.labels = vec!["SPAM".to_string()];
        let provider = FakeMail {
            messages: vec![spam],
            last_query: Mutex::new(None),
        };
        let store = MemStore::default();
        let report = sync_emails(&provider, &classifier(), &store, 30, false)
            .await
            .unwrap();
        assert_eq!(report.synced, 1);
        let rows = store.rows.lock().unwrap();
        let stored = &rows["spam0"];
        assert!(!stored.email.is_hiring_related);
        assert_eq!(stored.email.confidence_score, 0.1);
    }
}
