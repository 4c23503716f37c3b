//! AI Classifier — best-effort deep analysis through the completion service.
//!
//! Only invoked when the cheap signals are ambiguous (see `classify::mod`).
//! Every failure path collapses into the fixed degraded default; the caller
//! never sees an error from this stage.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::classify::prompts::{ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::email::{EmailCategory, EmailPriority};

/// Body text is truncated to this many characters before prompting, to bound
/// token spend per call.
const MAX_BODY_CHARS: usize = 2000;
const MAX_COMPLETION_TOKENS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpamLikelihood {
    Low,
    Medium,
    High,
}

/// Normalized AI analysis. `is_hiring_related` and `category` stay optional:
/// when the model omits them the combiner falls back to the keyword result.
#[derive(Debug, Clone)]
pub struct AiAnalysis {
    pub is_hiring_related: Option<bool>,
    pub confidence: f64,
    pub category: Option<EmailCategory>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub priority: EmailPriority,
    pub key_details: Vec<String>,
    pub next_action: Option<String>,
    pub spam_likelihood: SpamLikelihood,
    pub legitimacy_indicators: Vec<String>,
    pub red_flags: Vec<String>,
}

impl AiAnalysis {
    /// The degraded-but-valid result used whenever the AI stage fails.
    pub fn degraded_default() -> Self {
        Self {
            is_hiring_related: Some(false),
            confidence: 0.5,
            category: Some(EmailCategory::Other),
            company_name: None,
            job_title: None,
            priority: EmailPriority::Medium,
            key_details: vec![],
            next_action: None,
            spam_likelihood: SpamLikelihood::Medium,
            legitimacy_indicators: vec![],
            red_flags: vec![],
        }
    }
}

/// Tagged outcome of the AI stage, so the combiner never branches on errors.
#[derive(Debug, Clone)]
pub enum AiOutcome {
    Analyzed(AiAnalysis),
    Degraded(AiAnalysis),
}

impl AiOutcome {
    pub fn analysis(&self) -> &AiAnalysis {
        match self {
            AiOutcome::Analyzed(a) | AiOutcome::Degraded(a) => a,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AiOutcome::Degraded(_))
    }
}

/// The AI analysis seam. Production uses `LlmAnalyzer`; tests substitute
/// recording or panicking fakes.
#[async_trait]
pub trait AiAnalyzer: Send + Sync {
    async fn analyze(&self, subject: &str, sender_email: &str, body: &str) -> AiOutcome;
}

/// JSON contract the prompt asks the model to honor. Every field is optional
/// on the wire; normalization supplies defaults and clamps ranges.
#[derive(Debug, Deserialize)]
struct AiWire {
    is_hiring_related: Option<bool>,
    confidence_score: Option<f64>,
    category: Option<String>,
    company_name: Option<String>,
    job_title: Option<String>,
    priority: Option<String>,
    #[serde(default)]
    key_details: Vec<String>,
    next_action_required: Option<String>,
    spam_likelihood: Option<String>,
    #[serde(default)]
    legitimacy_indicators: Vec<String>,
    #[serde(default)]
    red_flags: Vec<String>,
}

/// Explicit free-text → enum lookup. Unknown strings map to `Other`.
fn map_category(raw: &str) -> EmailCategory {
    match raw.to_lowercase().as_str() {
        "job_application" => EmailCategory::JobApplication,
        "interview_invitation" => EmailCategory::InterviewInvitation,
        "rejection" => EmailCategory::Rejection,
        "offer" => EmailCategory::Offer,
        "recruiter_outreach" => EmailCategory::RecruiterOutreach,
        "follow_up" => EmailCategory::FollowUp,
        _ => EmailCategory::Other,
    }
}

fn map_priority(raw: Option<&str>) -> EmailPriority {
    match raw.map(|p| p.to_lowercase()) {
        Some(p) if p == "low" => EmailPriority::Low,
        Some(p) if p == "high" => EmailPriority::High,
        _ => EmailPriority::Medium,
    }
}

fn map_spam_likelihood(raw: Option<&str>) -> SpamLikelihood {
    match raw.map(|s| s.to_lowercase()) {
        Some(s) if s == "low" => SpamLikelihood::Low,
        Some(s) if s == "high" => SpamLikelihood::High,
        _ => SpamLikelihood::Medium,
    }
}

fn normalize(wire: AiWire) -> AiAnalysis {
    AiAnalysis {
        is_hiring_related: wire.is_hiring_related,
        confidence: wire.confidence_score.unwrap_or(0.5).clamp(0.0, 1.0),
        category: wire.category.as_deref().map(map_category),
        company_name: wire.company_name,
        job_title: wire.job_title,
        priority: map_priority(wire.priority.as_deref()),
        key_details: wire.key_details,
        next_action: wire.next_action_required,
        spam_likelihood: map_spam_likelihood(wire.spam_likelihood.as_deref()),
        legitimacy_indicators: wire.legitimacy_indicators,
        red_flags: wire.red_flags,
    }
}

/// Truncates on a char boundary so prompts never split a code point.
fn truncate_body(body: &str) -> &str {
    if body.chars().count() <= MAX_BODY_CHARS {
        return body;
    }
    let end = body
        .char_indices()
        .nth(MAX_BODY_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    &body[..end]
}

/// Production analyzer backed by the shared LLM client.
pub struct LlmAnalyzer {
    llm: LlmClient,
}

impl LlmAnalyzer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AiAnalyzer for LlmAnalyzer {
    async fn analyze(&self, subject: &str, sender_email: &str, body: &str) -> AiOutcome {
        let prompt = ANALYSIS_PROMPT_TEMPLATE
            .replace("{subject}", subject)
            .replace("{sender}", sender_email)
            .replace("{body}", truncate_body(body));

        match self
            .llm
            .call_json::<AiWire>(&prompt, ANALYSIS_SYSTEM, MAX_COMPLETION_TOKENS)
            .await
        {
            Ok(wire) => AiOutcome::Analyzed(normalize(wire)),
            Err(e) => {
                warn!("AI analysis failed, using degraded default: {e}");
                AiOutcome::Degraded(AiAnalysis::degraded_default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AiAnalysis {
        normalize(serde_json::from_str::<AiWire>(json).unwrap())
    }

    #[test]
    fn test_full_wire_response_normalizes() {
        let analysis = parse(
            r#"{
                "is_hiring_related": true,
                "confidence_score": 0.85,
                "category": "interview_invitation",
                "company_name": "Acme Corp",
                "job_title": "Software Engineer",
                "priority": "high",
                "key_details": ["onsite Tuesday"],
                "next_action_required": "Confirm availability",
                "spam_likelihood": "low",
                "legitimacy_indicators": ["corporate domain"],
                "red_flags": []
            }"#,
        );
        assert_eq!(analysis.is_hiring_related, Some(true));
        assert!((analysis.confidence - 0.85).abs() < 1e-9);
        assert_eq!(analysis.category, Some(EmailCategory::InterviewInvitation));
        assert_eq!(analysis.priority, EmailPriority::High);
        assert_eq!(analysis.spam_likelihood, SpamLikelihood::Low);
        assert_eq!(analysis.company_name.as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn test_out_of_range_confidence_is_clamped() {
        let high = parse(r#"{"confidence_score": 3.5}"#);
        assert_eq!(high.confidence, 1.0);
        let low = parse(r#"{"confidence_score": -0.2}"#);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let analysis = parse("{}");
        assert_eq!(analysis.is_hiring_related, None);
        assert_eq!(analysis.confidence, 0.5);
        assert_eq!(analysis.category, None);
        assert_eq!(analysis.priority, EmailPriority::Medium);
        assert_eq!(analysis.spam_likelihood, SpamLikelihood::Medium);
        assert!(analysis.key_details.is_empty());
    }

    #[test]
    fn test_unknown_category_maps_to_other() {
        let analysis = parse(r#"{"category": "party_invitation"}"#);
        assert_eq!(analysis.category, Some(EmailCategory::Other));
    }

    #[test]
    fn test_category_mapping_is_case_insensitive() {
        let analysis = parse(r#"{"category": "OFFER"}"#);
        assert_eq!(analysis.category, Some(EmailCategory::Offer));
    }

    #[test]
    fn test_degraded_default_shape() {
        let d = AiAnalysis::degraded_default();
        assert_eq!(d.is_hiring_related, Some(false));
        assert_eq!(d.confidence, 0.5);
        assert_eq!(d.category, Some(EmailCategory::Other));
        assert_eq!(d.priority, EmailPriority::Medium);
        assert_eq!(d.spam_likelihood, SpamLikelihood::Medium);
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(MAX_BODY_CHARS + 100);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.chars().count(), MAX_BODY_CHARS);
    }

    #[test]
    fn test_truncate_body_short_input_untouched() {
        assert_eq!(truncate_body("short"), "short");
    }
}
