//! Classification Combiner — folds the spam, keyword, and AI stages into the
//! single result the sync pipeline persists.

use serde::Serialize;

use crate::classify::ai::AiAnalysis;
use crate::classify::keywords::KeywordAnalysis;
use crate::classify::spam::SpamAnalysis;
use crate::models::email::{EmailCategory, EmailPriority};

/// Weights for blending keyword and AI confidence.
const KEYWORD_WEIGHT: f64 = 0.3;
const AI_WEIGHT: f64 = 0.7;

/// Which path produced the final verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    SpamFiltered,
    Keyword,
    Combined,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub is_relevant: bool,
    pub confidence: f64,
    pub category: EmailCategory,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub priority: EmailPriority,
    pub key_details: Vec<String>,
    pub next_action: Option<String>,
    pub spam: SpamAnalysis,
    pub method: AnalysisMethod,
}

impl ClassificationResult {
    /// Spam short-circuit: fixed verdict, no further analysis was run.
    pub fn spam_filtered(spam: SpamAnalysis) -> Self {
        Self {
            is_relevant: false,
            confidence: 0.1,
            category: EmailCategory::Other,
            company_name: None,
            job_title: None,
            priority: EmailPriority::Low,
            key_details: vec![],
            next_action: None,
            spam,
            method: AnalysisMethod::SpamFiltered,
        }
    }

    /// Keyword-only verdict, used when confidence was too low to justify an
    /// AI call.
    pub fn from_keyword(kw: &KeywordAnalysis, spam: SpamAnalysis) -> Self {
        Self {
            is_relevant: kw.is_hiring_related,
            confidence: kw.confidence,
            category: kw.category,
            company_name: None,
            job_title: None,
            priority: EmailPriority::Medium,
            key_details: vec![],
            next_action: None,
            spam,
            method: AnalysisMethod::Keyword,
        }
    }

    /// Weighted blend of the keyword and AI verdicts. AI fields win when
    /// present; keyword values fill the gaps.
    pub fn combined(kw: &KeywordAnalysis, ai: &AiAnalysis, spam: SpamAnalysis) -> Self {
        let confidence =
            (KEYWORD_WEIGHT * kw.confidence + AI_WEIGHT * ai.confidence).clamp(0.0, 1.0);
        Self {
            is_relevant: ai.is_hiring_related.unwrap_or(kw.is_hiring_related),
            confidence,
            category: ai.category.unwrap_or(kw.category),
            company_name: ai.company_name.clone(),
            job_title: ai.job_title.clone(),
            priority: ai.priority,
            key_details: ai.key_details.clone(),
            next_action: ai.next_action.clone(),
            spam,
            method: AnalysisMethod::Combined,
        }
    }
}
