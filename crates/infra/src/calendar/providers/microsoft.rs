//! Microsoft Outlook calendar provider implementation
//!
//! Busy time comes from the calendarView endpoint filtered to
//! busy/tentative events; Graph returns wall-clock times in the zone named
//! by the Prefer header, so everything is requested in UTC and normalized
//! on parse.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use hourglass_core::ports::{BusyCalendarProvider, CalendarEventRequest};
use hourglass_domain::{HourglassError, ProviderKind, Result, TimeSlot};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::super::credentials::CredentialManager;

const MICROSOFT_GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
const OUTLOOK_TIMEZONE_HEADER: &str = r#"outlook.timezone="UTC""#;

/// Microsoft Graph calendar provider for one account.
pub struct MicrosoftCalendarProvider {
    client: Client,
    credentials: Arc<CredentialManager>,
    account: String,
    api_base: String,
}

impl MicrosoftCalendarProvider {
    pub fn new(credentials: Arc<CredentialManager>, account: String) -> Self {
        Self::with_api_base(credentials, account, MICROSOFT_GRAPH_API_BASE.to_string())
    }

    /// Point the provider at a different API origin (integration tests).
    pub fn with_api_base(
        credentials: Arc<CredentialManager>,
        account: String,
        api_base: String,
    ) -> Self {
        Self { client: super::super::http_client(), credentials, account, api_base }
    }

    async fn access_token(&self) -> Result<String> {
        self.credentials.access_token(&self.account, ProviderKind::Outlook).await
    }
}

#[async_trait]
impl BusyCalendarProvider for MicrosoftCalendarProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Outlook
    }

    async fn busy_times(&self, range: TimeSlot) -> Result<Vec<TimeSlot>> {
        let access_token = self.access_token().await?;
        let url = format!("{}/me/calendarView", self.api_base);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&access_token)
            .header("Prefer", OUTLOOK_TIMEZONE_HEADER)
            .query(&[
                ("startDateTime", iso(range.start)),
                ("endDateTime", iso(range.end)),
                ("$select", "start,end,showAs".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                HourglassError::Upstream(format!("Microsoft calendarView request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(HourglassError::Upstream(format!(
                "Microsoft calendarView error ({status}): {body}"
            )));
        }

        let view: CalendarViewResponse = response.json().await.map_err(|e| {
            HourglassError::Upstream(format!("failed to parse Microsoft response: {e}"))
        })?;

        // Only busy and tentative events block slots; free/out-of-office
        // markers do not
        let busy = view
            .value
            .into_iter()
            .filter(|event| event.show_as == "busy" || event.show_as == "tentative")
            .filter_map(|event| {
                let start = parse_graph_time(&event.start.date_time)?;
                let end = parse_graph_time(&event.end.date_time)?;
                Some(TimeSlot { start, end })
            })
            .collect();
        Ok(busy)
    }

    async fn create_event(&self, request: &CalendarEventRequest) -> Result<String> {
        let access_token = self.access_token().await?;
        let url = format!("{}/me/events", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&access_token)
            .json(&json!({
                "subject": request.summary,
                "body": { "contentType": "text", "content": request.description },
                "start": { "dateTime": graph_time(request.slot.start), "timeZone": "UTC" },
                "end": { "dateTime": graph_time(request.slot.end), "timeZone": "UTC" },
                "attendees": [{
                    "emailAddress": { "address": request.attendee_email },
                    "type": "required",
                }],
                "isOnlineMeeting": true,
            }))
            .send()
            .await
            .map_err(|e| {
                HourglassError::Upstream(format!("Microsoft event creation failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(HourglassError::Upstream(format!(
                "Microsoft event creation error ({status}): {body}"
            )));
        }

        let created: CreatedEvent = response.json().await.map_err(|e| {
            HourglassError::Upstream(format!("failed to parse Microsoft event response: {e}"))
        })?;
        Ok(created.id)
    }

    async fn update_event(&self, event_ref: &str, slot: TimeSlot) -> Result<()> {
        let access_token = self.access_token().await?;
        let url = format!("{}/me/events/{}", self.api_base, event_ref);

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&access_token)
            .json(&json!({
                "start": { "dateTime": graph_time(slot.start), "timeZone": "UTC" },
                "end": { "dateTime": graph_time(slot.end), "timeZone": "UTC" },
            }))
            .send()
            .await
            .map_err(|e| {
                HourglassError::Upstream(format!("Microsoft event update failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(HourglassError::Upstream(format!(
                "Microsoft event update error ({status}): {body}"
            )));
        }
        Ok(())
    }

    async fn delete_event(&self, event_ref: &str) -> Result<()> {
        let access_token = self.access_token().await?;
        let url = format!("{}/me/events/{}", self.api_base, event_ref);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| {
                HourglassError::Upstream(format!("Microsoft event delete failed: {e}"))
            })?;

        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND
        {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(HourglassError::Upstream(format!(
                "Microsoft event delete error ({status}): {body}"
            )));
        }
        Ok(())
    }
}

fn iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Graph wants wall-clock values without a zone suffix (the timeZone field
/// carries the zone).
fn graph_time(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Graph returns times like `2026-06-15T14:00:00.0000000` in the preferred
/// zone (UTC here), without a suffix.
fn parse_graph_time(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Deserialize)]
struct CalendarViewResponse {
    #[serde(default)]
    value: Vec<GraphEvent>,
}

#[derive(Debug, Deserialize)]
struct GraphEvent {
    start: GraphDateTime,
    end: GraphDateTime,
    #[serde(rename = "showAs", default)]
    show_as: String,
}

#[derive(Debug, Deserialize)]
struct GraphDateTime {
    #[serde(rename = "dateTime")]
    date_time: String,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}
