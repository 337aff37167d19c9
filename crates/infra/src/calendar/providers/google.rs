//! Google Calendar provider implementation
//!
//! Busy time comes from the freeBusy query endpoint; mirrored events go
//! through the events collection with a Meet conference attached.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use hourglass_core::ports::{BusyCalendarProvider, CalendarEventRequest};
use hourglass_domain::{HourglassError, ProviderKind, Result, TimeSlot};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::super::credentials::CredentialManager;

const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar provider for one account.
pub struct GoogleCalendarProvider {
    client: Client,
    credentials: Arc<CredentialManager>,
    account: String,
    api_base: String,
}

impl GoogleCalendarProvider {
    pub fn new(credentials: Arc<CredentialManager>, account: String) -> Self {
        Self::with_api_base(credentials, account, GOOGLE_CALENDAR_API_BASE.to_string())
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
        self.credentials.access_token(&self.account, ProviderKind::Google).await
    }
}

#[async_trait]
impl BusyCalendarProvider for GoogleCalendarProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn busy_times(&self, range: TimeSlot) -> Result<Vec<TimeSlot>> {
        let access_token = self.access_token().await?;
        let url = format!("{}/freeBusy", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&access_token)
            .json(&json!({
                "timeMin": iso(range.start),
                "timeMax": iso(range.end),
                "items": [{ "id": "primary" }],
            }))
            .send()
            .await
            .map_err(|e| {
                HourglassError::Upstream(format!("Google freeBusy request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(HourglassError::Upstream(format!(
                "Google freeBusy error ({status}): {body}"
            )));
        }

        let free_busy: FreeBusyResponse = response.json().await.map_err(|e| {
            HourglassError::Upstream(format!("failed to parse Google freeBusy response: {e}"))
        })?;

        let busy = free_busy
            .calendars
            .get("primary")
            .map(|c| c.busy.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|interval| parse_interval(&interval.start, &interval.end))
            .collect();
        Ok(busy)
    }

    async fn create_event(&self, request: &CalendarEventRequest) -> Result<String> {
        let access_token = self.access_token().await?;
        let url =
            format!("{}/calendars/primary/events?conferenceDataVersion=1", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&access_token)
            .json(&json!({
                "summary": request.summary,
                "description": request.description,
                "start": { "dateTime": iso(request.slot.start), "timeZone": "UTC" },
                "end": { "dateTime": iso(request.slot.end), "timeZone": "UTC" },
                "attendees": [{ "email": request.attendee_email }],
                "conferenceData": {
                    "createRequest": {
                        "requestId": Uuid::new_v4().to_string(),
                        "conferenceSolutionKey": { "type": "hangoutsMeet" },
                    },
                },
            }))
            .send()
            .await
            .map_err(|e| {
                HourglassError::Upstream(format!("Google event creation failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(HourglassError::Upstream(format!(
                "Google event creation error ({status}): {body}"
            )));
        }

        let created: CreatedEvent = response.json().await.map_err(|e| {
            HourglassError::Upstream(format!("failed to parse Google event response: {e}"))
        })?;
        Ok(created.id)
    }

    async fn update_event(&self, event_ref: &str, slot: TimeSlot) -> Result<()> {
        let access_token = self.access_token().await?;
        let url = format!("{}/calendars/primary/events/{}", self.api_base, event_ref);

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&access_token)
            .json(&json!({
                "start": { "dateTime": iso(slot.start), "timeZone": "UTC" },
                "end": { "dateTime": iso(slot.end), "timeZone": "UTC" },
            }))
            .send()
            .await
            .map_err(|e| HourglassError::Upstream(format!("Google event update failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(HourglassError::Upstream(format!(
                "Google event update error ({status}): {body}"
            )));
        }
        Ok(())
    }

    async fn delete_event(&self, event_ref: &str) -> Result<()> {
        let access_token = self.access_token().await?;
        let url = format!("{}/calendars/primary/events/{}", self.api_base, event_ref);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| HourglassError::Upstream(format!("Google event delete failed: {e}")))?;

        // A missing event is already deleted
        if !response.status().is_success()
            && response.status() != reqwest::StatusCode::NOT_FOUND
            && response.status() != reqwest::StatusCode::GONE
        {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(HourglassError::Upstream(format!(
                "Google event delete error ({status}): {body}"
            )));
        }
        Ok(())
    }
}

fn iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_interval(start: &str, end: &str) -> Option<TimeSlot> {
    let start = DateTime::parse_from_rfc3339(start).ok()?.with_timezone(&Utc);
    let end = DateTime::parse_from_rfc3339(end).ok()?.with_timezone(&Utc);
    Some(TimeSlot { start, end })
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    calendars: std::collections::HashMap<String, CalendarBusy>,
}

#[derive(Debug, Deserialize)]
struct CalendarBusy {
    #[serde(default)]
    busy: Vec<BusyInterval>,
}

#[derive(Debug, Deserialize)]
struct BusyInterval {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}
