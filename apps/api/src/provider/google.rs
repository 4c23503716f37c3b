//! Gmail / Google Calendar REST client.
//!
//! Only the read paths the sync orchestrator needs plus the two mutation
//! calls used by the status endpoint. OAuth token acquisition lives outside
//! this service; the client is handed a bearer token.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{
    Attendee, BodyPart, CalendarInfo, CalendarProvider, MailProvider, ProviderError, RawEvent,
    RawMessage,
};

const GMAIL_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const CALENDAR_BASE: &str = "https://www.googleapis.com/calendar/v3";

pub struct GoogleClient {
    client: Client,
    token: String,
}

impl GoogleClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            token,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        Self::check_status(&response)?;
        Ok(response.json::<T>().await?)
    }

    fn check_status(response: &reqwest::Response) -> Result<(), ProviderError> {
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::Auth(format!(
                "provider returned {status}; token expired or missing scope"
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: format!("request to {} failed", response.url()),
            });
        }
        Ok(())
    }

    async fn get_message_detail(&self, id: &str) -> Result<RawMessage, ProviderError> {
        let url = format!("{GMAIL_BASE}/messages/{id}");
        let detail: MessageDetail = self
            .get_json(&url, &[("format", "full".to_string())])
            .await?;
        Ok(parse_message(detail))
    }

    async fn modify_labels(
        &self,
        message_id: &str,
        remove: &[&str],
    ) -> Result<(), ProviderError> {
        let url = format!("{GMAIL_BASE}/messages/{message_id}/modify");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "removeLabelIds": remove }))
            .send()
            .await?;
        Self::check_status(&response)
    }
}

#[async_trait]
impl MailProvider for GoogleClient {
    async fn search_messages(
        &self,
        query: &str,
        max_results: u32,
        include_spam: bool,
    ) -> Result<Vec<RawMessage>, ProviderError> {
        let url = format!("{GMAIL_BASE}/messages");
        let list: MessageList = self
            .get_json(
                &url,
                &[
                    ("q", query.to_string()),
                    ("maxResults", max_results.to_string()),
                    ("includeSpamTrash", include_spam.to_string()),
                ],
            )
            .await?;

        debug!("Message search returned {} ids", list.messages.len());

        let mut messages = Vec::with_capacity(list.messages.len());
        for message_ref in &list.messages {
            // A single failed detail fetch must not abort the whole search.
            match self.get_message_detail(&message_ref.id).await {
                Ok(message) => messages.push(message),
                Err(ProviderError::Auth(e)) => return Err(ProviderError::Auth(e)),
                Err(e) => {
                    warn!("Failed to fetch message {}: {e}", message_ref.id);
                }
            }
        }
        Ok(messages)
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), ProviderError> {
        self.modify_labels(message_id, &["UNREAD"]).await
    }

    async fn archive(&self, message_id: &str) -> Result<(), ProviderError> {
        self.modify_labels(message_id, &["INBOX"]).await
    }
}

#[async_trait]
impl CalendarProvider for GoogleClient {
    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, ProviderError> {
        let url = format!("{CALENDAR_BASE}/users/me/calendarList");
        let list: CalendarList = self.get_json(&url, &[]).await?;
        Ok(list
            .items
            .into_iter()
            .map(|c| CalendarInfo {
                id: c.id,
                summary: c.summary.unwrap_or_default(),
                primary: c.primary,
                selected: c.selected,
            })
            .collect())
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, ProviderError> {
        let url = format!("{CALENDAR_BASE}/calendars/{calendar_id}/events");
        let list: EventList = self
            .get_json(
                &url,
                &[
                    ("timeMin", time_min.to_rfc3339()),
                    ("timeMax", time_max.to_rfc3339()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                    ("maxResults", "100".to_string()),
                ],
            )
            .await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|e| parse_event(e, calendar_id))
            .collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDetail {
    id: String,
    thread_id: String,
    #[serde(default)]
    label_ids: Vec<String>,
    #[serde(default)]
    snippet: String,
    payload: Option<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct PartBody {
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarList {
    #[serde(default)]
    items: Vec<CalendarEntry>,
}

#[derive(Debug, Deserialize)]
struct CalendarEntry {
    id: String,
    summary: Option<String>,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    selected: bool,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDetail {
    id: String,
    #[serde(default)]
    summary: String,
    description: Option<String>,
    location: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    status: Option<String>,
    organizer: Option<Organizer>,
    #[serde(default)]
    attendees: Vec<AttendeeDetail>,
    conference_data: Option<ConferenceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<String>,
    date: Option<String>,
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organizer {
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttendeeDetail {
    email: Option<String>,
    display_name: Option<String>,
    response_status: Option<String>,
    #[serde(default)]
    optional: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceData {
    #[serde(default)]
    entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryPoint {
    entry_point_type: Option<String>,
    uri: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Response → transient record conversion (pure, fixture-tested)
// ────────────────────────────────────────────────────────────────────────────

fn parse_message(detail: MessageDetail) -> RawMessage {
    let payload = detail.payload.unwrap_or_default();

    let header = |name: &str| -> Option<&str> {
        payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    };

    let from = header("From").unwrap_or_default();
    let to = header("To").unwrap_or_default();
    let date_received = header("Date")
        .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let subject = header("Subject").unwrap_or_default().to_string();
    let (sender_name, sender_email) = parse_mailbox(from);
    let (_, recipient_email) = parse_mailbox(to);

    RawMessage {
        id: detail.id,
        thread_id: detail.thread_id,
        subject,
        sender_name,
        sender_email,
        recipient_email,
        body: part_to_body(payload),
        snippet: detail.snippet,
        labels: detail.label_ids,
        date_received,
    }
}

fn part_to_body(part: Part) -> BodyPart {
    BodyPart {
        mime_type: part.mime_type,
        data: part.body.and_then(|b| b.data),
        parts: part.parts.into_iter().map(part_to_body).collect(),
    }
}

/// Splits a `Name <addr@example.com>` mailbox header into name and address.
/// A bare address yields no name; anything unrecognizable passes through
/// as the address so downstream spam heuristics can flag it.
fn parse_mailbox(value: &str) -> (Option<String>, String) {
    let value = value.trim();
    if value.is_empty() {
        return (None, String::new());
    }
    if let Some(open) = value.find('<') {
        if let Some(close) = value[open..].find('>') {
            let email = value[open + 1..open + close].trim().to_string();
            let name = value[..open].trim().trim_matches('"').to_string();
            let name = if name.is_empty() { None } else { Some(name) };
            return (name, email);
        }
    }
    (None, value.to_string())
}

fn parse_event(detail: EventDetail, calendar_id: &str) -> Option<RawEvent> {
    let start = detail.start?;
    let end = detail.end?;

    let (start_at, timezone, is_all_day) = parse_event_time(&start)?;
    let (end_at, _, _) = parse_event_time(&end)?;

    let meeting_link = detail.conference_data.and_then(|c| {
        c.entry_points
            .into_iter()
            .find(|e| e.entry_point_type.as_deref() == Some("video"))
            .and_then(|e| e.uri)
    });

    let (organizer_email, organizer_name) = match detail.organizer {
        Some(o) => (o.email, o.display_name),
        None => (None, None),
    };

    Some(RawEvent {
        id: detail.id,
        calendar_id: calendar_id.to_string(),
        summary: detail.summary,
        description: detail.description,
        location: detail.location,
        start_at,
        end_at,
        timezone,
        is_all_day,
        status: detail.status.unwrap_or_else(|| "confirmed".to_string()),
        organizer_email,
        organizer_name,
        attendees: detail
            .attendees
            .into_iter()
            .filter_map(|a| {
                Some(Attendee {
                    email: a.email?,
                    name: a.display_name,
                    response_status: a.response_status,
                    optional: a.optional,
                })
            })
            .collect(),
        meeting_link,
    })
}

/// Returns (instant, timezone, is_all_day). Timed events carry `dateTime`,
/// all-day events carry a bare `date`.
fn parse_event_time(time: &EventTime) -> Option<(DateTime<Utc>, Option<String>, bool)> {
    if let Some(date_time) = &time.date_time {
        let parsed = DateTime::parse_from_rfc3339(date_time).ok()?;
        return Some((parsed.with_timezone(&Utc), time.time_zone.clone(), false));
    }
    if let Some(date) = &time.date {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let midnight = day.and_hms_opt(0, 0, 0)?.and_utc();
        return Some((midnight, None, true));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mailbox_with_display_name() {
        let (name, email) = parse_mailbox("Jane Doe <jane@acmecorp.com>");
        assert_eq!(name.as_deref(), Some("Jane Doe"));
        assert_eq!(email, "jane@acmecorp.com");
    }

    #[test]
    fn test_parse_mailbox_quoted_name() {
        let (name, email) = parse_mailbox("\"Doe, Jane\" <jane@acmecorp.com>");
        assert_eq!(name.as_deref(), Some("Doe, Jane"));
        assert_eq!(email, "jane@acmecorp.com");
    }

    #[test]
    fn test_parse_mailbox_bare_address() {
        let (name, email) = parse_mailbox("jane@acmecorp.com");
        assert_eq!(name, None);
        assert_eq!(email, "jane@acmecorp.com");
    }

    #[test]
    fn test_parse_mailbox_empty() {
        let (name, email) = parse_mailbox("");
        assert_eq!(name, None);
        assert_eq!(email, "");
    }

    #[test]
    fn test_parse_message_from_fixture() {
        let json = r#"{
            "id": "m-1",
            "threadId": "t-1",
            "labelIds": ["INBOX", "UNREAD"],
            "snippet": "We would like to schedule an interview",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    {"name": "Subject", "value": "Interview Invitation"},
                    {"name": "From", "value": "Jane Doe <jane@acmecorp.com>"},
                    {"name": "To", "value": "me@example.com"},
                    {"name": "Date", "value": "Tue, 4 Mar 2025 10:00:00 +0000"}
                ],
                "parts": [
                    {"mimeType": "text/plain", "body": {"data": "aGVsbG8"}}
                ]
            }
        }"#;
        let detail: MessageDetail = serde_json::from_str(json).unwrap();
        let message = parse_message(detail);
        assert_eq!(message.id, "m-1");
        assert_eq!(message.subject, "Interview Invitation");
        assert_eq!(message.sender_email, "jane@acmecorp.com");
        assert_eq!(message.labels, vec!["INBOX", "UNREAD"]);
        assert_eq!(message.body.parts.len(), 1);
        assert_eq!(message.body.parts[0].mime_type, "text/plain");
    }

    #[test]
    fn test_parse_message_tolerates_missing_payload() {
        let json = r#"{"id": "m-2", "threadId": "t-2"}"#;
        let detail: MessageDetail = serde_json::from_str(json).unwrap();
        let message = parse_message(detail);
        assert_eq!(message.subject, "");
        assert_eq!(message.sender_email, "");
        assert!(message.body.parts.is_empty());
    }

    #[test]
    fn test_parse_event_timed_with_meeting_link() {
        let json = r#"{
            "id": "e-1",
            "summary": "Technical Interview",
            "status": "confirmed",
            "start": {"dateTime": "2025-03-04T15:00:00Z", "timeZone": "UTC"},
            "end": {"dateTime": "2025-03-04T16:00:00Z"},
            "organizer": {"email": "hr@acmecorp.com", "displayName": "Acme HR"},
            "attendees": [
                {"email": "me@example.com", "responseStatus": "accepted"},
                {"displayName": "room"}
            ],
            "conferenceData": {
                "entryPoints": [
                    {"entryPointType": "phone", "uri": "tel:+1555"},
                    {"entryPointType": "video", "uri": "https://meet.example.com/abc"}
                ]
            }
        }"#;
        let detail: EventDetail = serde_json::from_str(json).unwrap();
        let event = parse_event(detail, "primary").unwrap();
        assert_eq!(event.id, "e-1");
        assert!(!event.is_all_day);
        assert_eq!(event.meeting_link.as_deref(), Some("https://meet.example.com/abc"));
        // Attendees without an email are dropped.
        assert_eq!(event.attendees.len(), 1);
        assert_eq!(event.organizer_email.as_deref(), Some("hr@acmecorp.com"));
    }

    #[test]
    fn test_parse_event_all_day() {
        let json = r#"{
            "id": "e-2",
            "summary": "Application deadline",
            "start": {"date": "2025-03-10"},
            "end": {"date": "2025-03-11"}
        }"#;
        let detail: EventDetail = serde_json::from_str(json).unwrap();
        let event = parse_event(detail, "primary").unwrap();
        assert!(event.is_all_day);
        assert_eq!(event.status, "confirmed");
    }

    #[test]
    fn test_parse_event_without_start_is_dropped() {
        let json = r#"{"id": "e-3", "summary": "broken"}"#;
        let detail: EventDetail = serde_json::from_str(json).unwrap();
        assert!(parse_event(detail, "primary").is_none());
    }
}
