//! Spam Scorer — independent additive heuristic evaluated before any other
//! classification work. It is the primary cost-control gate: anything it
//! flags never reaches the keyword or AI stages.

use serde::Serialize;

/// Score at or above which a message is considered likely spam.
const SPAM_THRESHOLD: f64 = 3.0;
/// Normalization divisor for the confidence value.
const CONFIDENCE_SCALE: f64 = 6.0;

/// Spam vocabulary, injected at construction so tests can override it.
#[derive(Debug, Clone)]
pub struct SpamVocab {
    pub phrases: Vec<&'static str>,
    pub disposable_domains: Vec<&'static str>,
    pub spoofed_domains: Vec<&'static str>,
    pub generic_subjects: Vec<&'static str>,
    pub automated_senders: Vec<&'static str>,
}

impl Default for SpamVocab {
    fn default() -> Self {
        Self {
            phrases: vec![
                // Obvious spam/scam phrases
                "make money fast",
                "easy money",
                "get rich quick",
                "work from home scam",
                "no experience required",
                "earn $",
                "guaranteed income",
                "click here now",
                "limited time offer",
                "act now",
                "urgent response required",
                "congratulations you have won",
                "claim your prize",
                "verify account",
                // Suspicious hiring/job scams
                "mystery shopper",
                "envelope stuffing",
                "data entry from home",
                "high paying job with no experience",
                "earn thousands weekly",
                "payment processing",
                "money transfer",
                // Phishing indicators
                "update your information",
                "confirm your identity",
                "suspended account",
                "click this link",
                "install software",
                // Generic suspicious language
                "this is not spam",
                "once in a lifetime",
                "opportunity of a lifetime",
                "risk-free",
                "money back guarantee",
            ],
            disposable_domains: vec![
                "tempmail",
                "guerrillamail",
                "10minutemail",
                "mailinator",
                "throwaway",
                "disposable",
                "temp-mail",
            ],
            spoofed_domains: vec![
                "gmai1.com",
                "yahool.com",
                "hotmai1.com",
                "outlok.com",
                "linkedln.com",
                "goog1e.com",
                "microsof.com",
            ],
            generic_subjects: vec![
                "urgent",
                "important",
                "please read",
                "hello",
                "hi there",
                "job offer",
                "employment opportunity",
                "work from home",
            ],
            automated_senders: vec![
                "admin",
                "noreply",
                "automated",
                "system",
                "robot",
                "hr department",
                "hiring team",
                "recruitment",
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpamAnalysis {
    pub is_likely_spam: bool,
    pub spam_score: f64,
    pub confidence: f64,
    /// Triggered signals, in evaluation order.
    pub indicators: Vec<String>,
}

/// Scores independent spam signals; each contributes a fixed increment.
pub fn analyze(
    vocab: &SpamVocab,
    subject: &str,
    body: &str,
    sender_email: &str,
    sender_name: Option<&str>,
    labels: &[String],
) -> SpamAnalysis {
    let subject_lower = subject.to_lowercase();
    let body_lower = body.to_lowercase();
    let sender = sender_email.to_lowercase();

    let mut score = 0.0f64;
    let mut indicators = Vec::new();
    fn hit(amount: f64, indicator: String, score: &mut f64, out: &mut Vec<String>) {
        *score += amount;
        out.push(indicator);
    }

    if labels.iter().any(|l| l == "SPAM") {
        hit(2.0, "Currently in spam folder".into(), &mut score, &mut indicators);
    }

    let content = format!("{subject_lower} {body_lower}");
    for phrase in &vocab.phrases {
        // Once per phrase type, not per repeated occurrence.
        if content.contains(phrase) {
            hit(
                1.0,
                format!("Contains phrase: '{phrase}'"),
                &mut score,
                &mut indicators,
            );
        }
    }

    if sender.is_empty() || !sender.contains('@') {
        hit(
            1.0,
            "Invalid or missing sender email".into(),
            &mut score,
            &mut indicators,
        );
    } else {
        let domain = sender.split('@').nth(1).unwrap_or("");
        if vocab.disposable_domains.iter().any(|d| domain.contains(d)) {
            hit(
                2.0,
                "Temporary/disposable email domain".into(),
                &mut score,
                &mut indicators,
            );
        }
        if vocab.spoofed_domains.contains(&domain) {
            hit(
                3.0,
                "Spoofed legitimate domain".into(),
                &mut score,
                &mut indicators,
            );
        }
    }

    if !subject.is_empty() {
        if is_all_caps(subject) && subject.len() > 10 {
            hit(
                1.0,
                "Subject line in all caps".into(),
                &mut score,
                &mut indicators,
            );
        }
        let bangs = subject.matches('!').count();
        let questions = subject.matches('?').count();
        if bangs > 2 || questions > 2 {
            hit(
                1.0,
                "Excessive punctuation in subject".into(),
                &mut score,
                &mut indicators,
            );
        }
        if vocab
            .generic_subjects
            .iter()
            .any(|g| subject_lower.contains(g))
        {
            hit(
                0.5,
                "Generic/vague subject line".into(),
                &mut score,
                &mut indicators,
            );
        }
    }

    if !body.is_empty() {
        if body.len() < 50 {
            hit(
                1.0,
                "Unusually short email content".into(),
                &mut score,
                &mut indicators,
            );
        }
        let currency = body.matches('$').count() + body.matches('€').count() + body.matches('£').count();
        if currency > 3 {
            hit(
                1.0,
                "Multiple currency references".into(),
                &mut score,
                &mut indicators,
            );
        }
        let links = body_lower.matches("http").count() + body_lower.matches("www.").count();
        if links > 5 {
            hit(
                1.0,
                "Excessive number of links".into(),
                &mut score,
                &mut indicators,
            );
        }
    }

    if let Some(name) = sender_name {
        let name = name.to_lowercase();
        if vocab.automated_senders.iter().any(|s| name.contains(s)) {
            hit(
                0.5,
                "Generic/automated sender name".into(),
                &mut score,
                &mut indicators,
            );
        }
    }

    SpamAnalysis {
        is_likely_spam: score >= SPAM_THRESHOLD,
        spam_score: score,
        confidence: (score / CONFIDENCE_SCALE).min(1.0),
        indicators,
    }
}

/// At least one cased character, and every cased character is uppercase.
/// Digits and punctuation are ignored.
fn is_all_caps(text: &str) -> bool {
    let mut any_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            any_cased = true;
        }
    }
    any_cased
}
