//! Keyword Scorer — cheap, deterministic lexical classifier.
//!
//! Three weighted vocabulary tiers plus a sender-domain boost produce a
//! hiring-relevance confidence; an ordered first-match-wins rule table
//! produces the coarse category guess.

use serde::Serialize;

use crate::models::email::EmailCategory;

/// Per-hit weights for the three tiers.
const HIGH_WEIGHT: f64 = 0.3;
const MEDIUM_WEIGHT: f64 = 0.15;
const LOW_WEIGHT: f64 = 0.05;
const DOMAIN_BOOST: f64 = 0.2;

/// Keyword vocabulary, injected at construction so tests can override it.
#[derive(Debug, Clone)]
pub struct KeywordVocab {
    pub high: Vec<&'static str>,
    pub medium: Vec<&'static str>,
    pub low: Vec<&'static str>,
    pub recruiter_domains: Vec<&'static str>,
}

impl Default for KeywordVocab {
    fn default() -> Self {
        Self {
            high: vec![
                "interview",
                "job offer",
                "position",
                "recruiter",
                "hiring manager",
                "job opportunity",
                "application",
                "resume",
                "cv",
                "background check",
                "onboarding",
                "salary",
                "compensation",
                "offer letter",
                "contract",
                "start date",
                "first day",
                "orientation",
                "team meeting",
                "technical assessment",
                "coding challenge",
                "take home test",
                "phone screen",
                "video interview",
                "in-person interview",
                "final round",
                "reference check",
                "employment",
                "join our team",
                "congratulations",
                "we would like to offer",
                "next steps",
                "thank you for interviewing",
            ],
            medium: vec![
                "opportunity",
                "career",
                "talent",
                "candidate",
                "screening",
                "assessment",
                "discussion",
                "chat",
                "call",
                "meeting",
                "position available",
                "opening",
                "vacancy",
                "human resources",
                "hr",
                "people team",
                "talent acquisition",
            ],
            low: vec![
                "professional",
                "network",
                "connect",
                "linkedin",
                "introduction",
                "referral",
                "recommendation",
            ],
            recruiter_domains: vec![
                "linkedin.com",
                "indeed.com",
                "glassdoor.com",
                "monster.com",
                "ziprecruiter.com",
                "careerbuilder.com",
                "dice.com",
                "angellist.com",
                "wellfound.com",
                "hired.com",
                "triplebyte.com",
                "toptal.com",
                "upwork.com",
                "freelancer.com",
            ],
        }
    }
}

/// Ordered category rules, first match wins. The order is a deliberate
/// precedence: a message mentioning both an interview and an offer is an
/// interview invitation.
const CATEGORY_RULES: &[(&[&str], EmailCategory)] = &[
    (
        &["interview", "schedule", "meeting", "call"],
        EmailCategory::InterviewInvitation,
    ),
    (
        &["offer", "congratulations", "pleased to offer"],
        EmailCategory::Offer,
    ),
    (
        &["unfortunately", "not moving forward", "different direction"],
        EmailCategory::Rejection,
    ),
    (
        &["follow up", "checking in", "update"],
        EmailCategory::FollowUp,
    ),
    (
        &["recruiter", "opportunity", "interested in"],
        EmailCategory::RecruiterOutreach,
    ),
    (
        &["application", "applied", "position"],
        EmailCategory::JobApplication,
    ),
];

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MatchCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordAnalysis {
    pub is_hiring_related: bool,
    pub confidence: f64,
    pub category: EmailCategory,
    pub match_counts: MatchCounts,
    pub domain_boosted: bool,
}

/// Scores `subject` + `body` (concatenated, lower-cased) against the tiers.
pub fn analyze(vocab: &KeywordVocab, subject: &str, body: &str, sender_email: &str) -> KeywordAnalysis {
    let content = format!("{subject} {body}").to_lowercase();
    let sender = sender_email.to_lowercase();

    let counts = MatchCounts {
        high: vocab.high.iter().filter(|k| content.contains(*k)).count(),
        medium: vocab.medium.iter().filter(|k| content.contains(*k)).count(),
        low: vocab.low.iter().filter(|k| content.contains(*k)).count(),
    };

    let domain_boosted = vocab.recruiter_domains.iter().any(|d| sender.contains(d));
    let boost = if domain_boosted { DOMAIN_BOOST } else { 0.0 };

    let confidence = (counts.high as f64 * HIGH_WEIGHT
        + counts.medium as f64 * MEDIUM_WEIGHT
        + counts.low as f64 * LOW_WEIGHT
        + boost)
        .min(1.0);

    KeywordAnalysis {
        is_hiring_related: confidence > 0.5,
        confidence,
        category: infer_category(&content),
        match_counts: counts,
        domain_boosted,
    }
}

/// First-match-wins over `CATEGORY_RULES`; anything unmatched is `Other`.
pub fn infer_category(lowercased: &str) -> EmailCategory {
    for (needles, category) in CATEGORY_RULES {
        if needles.iter().any(|n| lowercased.contains(n)) {
            return *category;
        }
    }
    EmailCategory::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> KeywordVocab {
        KeywordVocab::default()
    }

    #[test]
    fn test_confidence_stays_in_unit_interval() {
        // A subject stuffed with every high-tier keyword must still clamp to 1.0.
        let body = vocab().high.join(" ");
        let analysis = analyze(&vocab(), "everything", &body, "bot@linkedin.com");
        assert!(analysis.confidence <= 1.0);
        assert!(analysis.confidence >= 0.0);
        assert!(analysis.is_hiring_related);
    }

    #[test]
    fn test_single_high_hit_scores_point_three() {
        let analysis = analyze(&vocab(), "Your interview", "", "jane@acmecorp.com");
        assert!((analysis.confidence - 0.3).abs() < 1e-9);
        assert!(!analysis.is_hiring_related);
        assert_eq!(analysis.match_counts.high, 1);
    }

    #[test]
    fn test_interview_plus_call_scores_point_four_five() {
        // One high hit ("interview", 0.3) plus one medium hit ("call", 0.15).
        let analysis = analyze(
            &vocab(),
            "Interview Invitation – Software Engineer Role",
            "schedule a call next week",
            "jane@acmecorp.com",
        );
        assert!((analysis.confidence - 0.45).abs() < 1e-9);
        assert!(!analysis.is_hiring_related); // 0.45 <= 0.5
        assert_eq!(analysis.category, EmailCategory::InterviewInvitation);
    }

    #[test]
    fn test_domain_boost_applies_for_recruiter_platforms() {
        let boosted = analyze(&vocab(), "hello there friend", "", "jobs@indeed.com");
        let plain = analyze(&vocab(), "hello there friend", "", "jobs@acmecorp.com");
        assert!(boosted.domain_boosted);
        assert!(!plain.domain_boosted);
        assert!((boosted.confidence - plain.confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_threshold_is_strictly_above_half() {
        // "interview" + "offer letter" = 0.6 > 0.5
        let analysis = analyze(&vocab(), "interview and offer letter", "", "a@b.com");
        assert!(analysis.confidence > 0.5);
        assert!(analysis.is_hiring_related);
    }

    #[test]
    fn test_category_precedence_interview_beats_offer() {
        // Contains both rule-1 and rule-2 keywords; rule 1 is checked first.
        assert_eq!(
            infer_category("interview scheduled before the offer arrives"),
            EmailCategory::InterviewInvitation
        );
    }

    #[test]
    fn test_category_rejection() {
        assert_eq!(
            infer_category("unfortunately we went a different direction"),
            EmailCategory::Rejection
        );
    }

    #[test]
    fn test_category_recruiter_outreach() {
        assert_eq!(
            infer_category("a recruiter reached out about you"),
            EmailCategory::RecruiterOutreach
        );
    }

    #[test]
    fn test_category_unmatched_is_other() {
        assert_eq!(infer_category("weekly grocery list"), EmailCategory::Other);
    }

    #[test]
    fn test_category_is_deterministic() {
        let text = "interview schedule meeting call offer congratulations";
        assert_eq!(infer_category(text), infer_category(text));
    }

    #[test]
    fn test_vocab_override_changes_scoring() {
        let custom = KeywordVocab {
            high: vec!["xyzzy"],
            medium: vec![],
            low: vec![],
            recruiter_domains: vec![],
        };
        let analysis = analyze(&custom, "xyzzy xyzzy", "", "a@b.com");
        assert!((analysis.confidence - 0.3).abs() < 1e-9);
        assert_eq!(analysis.match_counts.high, 1);
    }
}
