//! Content Normalizer — turns a raw multi-part message body into the best
//! textual representation available, stripping tracking junk along the way.
//!
//! Pure functions, no I/O. A malformed leaf (bad base64, invalid UTF-8) is
//! skipped; extraction never fails.

use std::sync::LazyLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use regex::Regex;

use crate::provider::BodyPart;

/// Minimum trimmed length for a candidate to count as substantial content.
const MIN_SUBSTANTIAL_LEN: usize = 20;

/// Cleaned body content. Either field may be empty when no substantial
/// content could be extracted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedContent {
    pub text: String,
    pub html: String,
}

static LONG_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S{200,}").expect("valid regex"));
static TRACKING_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&](utm_[^&\s]*|tracking[^&\s]*|gclid[^&\s]*|fbclid[^&\s]*)")
        .expect("valid regex")
});
static ENCODED_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{100,}={0,2}").expect("valid regex"));
static LONG_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9_-]{50,}\b").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid regex"));
static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("valid regex"));

static SCRIPT_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>").expect("valid regex")
});
static HTML_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Patterns that mark a run of characters as tracking data.
static TRACKING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"https?://\S{100,}",       // very long URLs
        r"\b[A-Za-z0-9_-]{40,}\b",  // opaque tokens
        r"utm_\w+",
        r"(?i)tracking\w*",
        r"(?i)gclid|fbclid",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Extracts the best plain-text and HTML-derived content from a body-part
/// tree, falling back to the provider snippet when the body is junk.
pub fn extract_content(body: &BodyPart, snippet: &str) -> CleanedContent {
    let mut text_candidates = Vec::new();
    let mut html_candidates = Vec::new();
    collect_candidates(body, &mut text_candidates, &mut html_candidates);

    let mut text = select_candidate(&text_candidates);
    let html = select_candidate(&html_candidates);

    // Snippet fallback: body extraction failed or produced mostly garbage.
    if text.trim().len() < MIN_SUBSTANTIAL_LEN || is_mostly_tracking(&text) {
        let snippet = snippet.trim();
        if snippet.len() >= MIN_SUBSTANTIAL_LEN {
            text = snippet.to_string();
        }
    }

    CleanedContent { text, html }
}

fn collect_candidates(part: &BodyPart, text_out: &mut Vec<String>, html_out: &mut Vec<String>) {
    if let Some(data) = &part.data {
        if let Some(decoded) = decode_part(data) {
            match part.mime_type.as_str() {
                "text/plain" => {
                    let cleaned = clean_text(&decoded);
                    if cleaned.trim().len() > MIN_SUBSTANTIAL_LEN {
                        text_out.push(cleaned);
                    }
                }
                "text/html" => {
                    let cleaned = clean_text(&html_to_text(&decoded));
                    if cleaned.trim().len() > MIN_SUBSTANTIAL_LEN {
                        html_out.push(cleaned);
                    }
                }
                _ => {}
            }
        }
    }
    for sub in &part.parts {
        collect_candidates(sub, text_out, html_out);
    }
}

/// Picks the longest candidate that is not mostly tracking data; when every
/// candidate is tracking-heavy, the longest one wins regardless.
fn select_candidate(candidates: &[String]) -> String {
    let mut best: Option<&String> = None;
    for candidate in candidates {
        if is_mostly_tracking(candidate) {
            continue;
        }
        if best.map_or(true, |b| candidate.trim().len() > b.trim().len()) {
            best = Some(candidate);
        }
    }
    if best.is_none() {
        best = candidates.iter().max_by_key(|c| c.trim().len());
    }
    best.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Decodes one base64url body leaf. Returns None on malformed data so the
/// caller can skip the leaf.
fn decode_part(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok()
}

/// Removes tracking URLs, query parameters, and opaque tokens, and collapses
/// whitespace while preserving paragraph breaks.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = LONG_URL.replace_all(text, "[Long URL removed]");
    let text = TRACKING_PARAMS.replace_all(&text, "");
    let text = ENCODED_RUN.replace_all(&text, "[Encoded content removed]");
    let text = LONG_TOKEN.replace_all(&text, "[Token removed]");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    let text = SPACE_RUNS.replace_all(&text, " ");

    text.trim().to_string()
}

/// Strips script/style blocks and markup from HTML, leaving visible text.
pub fn html_to_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = SCRIPT_BLOCKS.replace_all(html, " ");
    let text = HTML_TAGS.replace_all(&text, " ");
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// A text is tracking-heavy when tracking-pattern character coverage exceeds
/// 30% of its length, or more than 10 pattern matches occur. Texts shorter
/// than 50 chars are treated as tracking-heavy as well — too little signal
/// to represent message intent.
pub fn is_mostly_tracking(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < 50 {
        return true;
    }

    let mut matches = 0usize;
    let mut covered = 0usize;
    for pattern in TRACKING_PATTERNS.iter() {
        for found in pattern.find_iter(trimmed) {
            matches += 1;
            covered += found.len();
        }
    }

    covered as f64 > trimmed.len() as f64 * 0.3 || matches > 10
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE;

    fn encode(text: &str) -> String {
        URL_SAFE.encode(text)
    }

    fn plain_leaf(text: &str) -> BodyPart {
        BodyPart {
            mime_type: "text/plain".to_string(),
            data: Some(encode(text)),
            parts: vec![],
        }
    }

    fn tree(parts: Vec<BodyPart>) -> BodyPart {
        BodyPart {
            mime_type: "multipart/alternative".to_string(),
            data: None,
            parts,
        }
    }

    const SUBSTANTIAL: &str = "Hello, we reviewed your application and would like \
        to schedule an interview with our engineering team next week.";

    #[test]
    fn test_clean_text_replaces_long_urls() {
        let url = format!("visit https://example.com/{} now", "x".repeat(250));
        let cleaned = clean_text(&url);
        assert!(cleaned.contains("[Long URL removed]"));
        assert!(!cleaned.contains("xxxx"));
    }

    #[test]
    fn test_clean_text_strips_utm_parameters() {
        let cleaned = clean_text("see https://jobs.example.com/role?utm_source=newsletter");
        assert!(!cleaned.contains("utm_source"));
        assert!(cleaned.contains("https://jobs.example.com/role"));
    }

    #[test]
    fn test_clean_text_replaces_long_tokens() {
        let text = format!("your code is {}", "a1B2".repeat(20));
        let cleaned = clean_text(&text);
        assert!(cleaned.contains("[Token removed]") || cleaned.contains("[Encoded content removed]"));
    }

    #[test]
    fn test_clean_text_collapses_blank_lines_and_spaces() {
        let cleaned = clean_text("para one\n\n\n\n\npara two   with   spaces");
        assert_eq!(cleaned, "para one\n\npara two with spaces");
    }

    #[test]
    fn test_html_to_text_strips_script_and_tags() {
        let html = "<html><script>evil()</script><style>.x{}</style><p>Real &amp; visible</p></html>";
        let text = html_to_text(html);
        assert!(!text.contains("evil"));
        assert!(!text.contains(".x{}"));
        assert!(text.contains("Real & visible"));
    }

    #[test]
    fn test_short_text_is_tracking_heavy() {
        assert!(is_mostly_tracking("tiny"));
        assert!(is_mostly_tracking(""));
    }

    #[test]
    fn test_substantial_prose_is_not_tracking_heavy() {
        assert!(!is_mostly_tracking(SUBSTANTIAL));
    }

    #[test]
    fn test_url_dominated_text_is_tracking_heavy() {
        let text = format!(
            "click https://t.example.com/{} here",
            "r".repeat(300)
        );
        assert!(is_mostly_tracking(&text));
    }

    #[test]
    fn test_extract_prefers_longest_clean_plain_part() {
        let short = "This is substantial enough content but shorter overall text.";
        let body = tree(vec![plain_leaf(short), plain_leaf(SUBSTANTIAL)]);
        let content = extract_content(&body, "");
        assert_eq!(content.text, SUBSTANTIAL);
    }

    #[test]
    fn test_extract_skips_malformed_leaf() {
        let mut bad = plain_leaf(SUBSTANTIAL);
        bad.data = Some("!!!not-base64!!!".to_string());
        let body = tree(vec![bad, plain_leaf(SUBSTANTIAL)]);
        let content = extract_content(&body, "");
        assert_eq!(content.text, SUBSTANTIAL);
    }

    #[test]
    fn test_extract_falls_back_to_snippet_for_empty_body() {
        let body = tree(vec![]);
        let snippet = "We would like to schedule an interview with you.";
        let content = extract_content(&body, snippet);
        assert_eq!(content.text, snippet);
    }

    #[test]
    fn test_extract_keeps_empty_text_when_snippet_too_short() {
        let body = tree(vec![]);
        let content = extract_content(&body, "too short");
        assert_eq!(content.text, "");
    }

    #[test]
    fn test_extract_nested_parts_are_visited() {
        let nested = tree(vec![tree(vec![plain_leaf(SUBSTANTIAL)])]);
        let content = extract_content(&nested, "");
        assert_eq!(content.text, SUBSTANTIAL);
    }

    #[test]
    fn test_extract_html_part_lands_in_html_field() {
        let html_leaf = BodyPart {
            mime_type: "text/html".to_string(),
            data: Some(encode(&format!("<p>{SUBSTANTIAL}</p>"))),
            parts: vec![],
        };
        let content = extract_content(&tree(vec![html_leaf]), "");
        assert_eq!(content.html, SUBSTANTIAL);
    }
}
