//! Prompt templates for the AI classification stage.

pub const ANALYSIS_SYSTEM: &str = "You are an expert email analyzer specializing in \
    identifying hiring-related emails. Return only valid JSON.";

/// Placeholders: `{subject}`, `{sender}`, `{body}`.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze this email to determine if it's related to job hiring/recruitment and extract relevant information.
Also assess if this could be spam masquerading as a legitimate hiring email.
Return ONLY a valid JSON object with the following structure:

{
    "is_hiring_related": true/false,
    "confidence_score": 0.0-1.0,
    "category": "job_application|interview_invitation|rejection|offer|recruiter_outreach|follow_up|other",
    "company_name": "extracted company name or null",
    "job_title": "extracted job title/position or null",
    "priority": "low|medium|high",
    "key_details": ["list", "of", "key", "points"],
    "next_action_required": "description of what the recipient should do next or null",
    "spam_likelihood": "low|medium|high",
    "legitimacy_indicators": ["list", "of", "signs", "this", "is", "legitimate"],
    "red_flags": ["list", "of", "potential", "spam", "indicators"]
}

Consider these factors for legitimacy:
- Specific company names and roles vs. generic language
- Professional tone and proper grammar
- Realistic job descriptions and requirements
- Legitimate company domains vs. suspicious domains
- Specific next steps vs. vague requests
- Reasonable compensation mentions vs. unrealistic promises

Email details:
Subject: {subject}
From: {sender}
Body: {body}
"#;
