//! Hiring-relevance classification pipeline.
//!
//! Stages run cheapest-first: spam heuristics short-circuit everything, the
//! keyword scorer gates the AI call, and the combiner folds whatever ran into
//! one `ClassificationResult`.

pub mod ai;
pub mod combine;
pub mod keywords;
pub mod normalize;
pub mod prompts;
pub mod spam;

use std::sync::Arc;

use tracing::debug;

use crate::classify::ai::AiAnalyzer;
use crate::classify::combine::ClassificationResult;
use crate::classify::keywords::KeywordVocab;
use crate::classify::spam::SpamVocab;

/// Keyword confidence strictly above this triggers the AI stage.
const AI_GATE: f64 = 0.3;

/// Normalized message fields the pipeline operates on. Calendar events map
/// onto the same shape (summary as subject, organizer as sender).
#[derive(Debug, Clone, Default)]
pub struct ClassifyInput {
    pub subject: String,
    pub body_text: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub labels: Vec<String>,
}

pub struct MessageClassifier {
    keyword_vocab: KeywordVocab,
    spam_vocab: SpamVocab,
    ai: Arc<dyn AiAnalyzer>,
}

impl MessageClassifier {
    pub fn new(ai: Arc<dyn AiAnalyzer>) -> Self {
        Self {
            keyword_vocab: KeywordVocab::default(),
            spam_vocab: SpamVocab::default(),
            ai,
        }
    }

    /// Runs the full pipeline for one message. Infallible: every failure mode
    /// below this point degrades instead of erroring.
    pub async fn classify(&self, input: &ClassifyInput) -> ClassificationResult {
        let spam = spam::analyze(
            &self.spam_vocab,
            &input.subject,
            &input.body_text,
            &input.sender_email,
            input.sender_name.as_deref(),
            &input.labels,
        );
        if spam.is_likely_spam {
            debug!(
                score = spam.spam_score,
                "message flagged as spam, skipping further analysis"
            );
            return ClassificationResult::spam_filtered(spam);
        }

        let kw = keywords::analyze(
            &self.keyword_vocab,
            &input.subject,
            &input.body_text,
            &input.sender_email,
        );
        if kw.confidence <= AI_GATE {
            return ClassificationResult::from_keyword(&kw, spam);
        }

        let outcome = self
            .ai
            .analyze(&input.subject, &input.sender_email, &input.body_text)
            .await;
        ClassificationResult::combined(&kw, outcome.analysis(), spam)
    }
}
