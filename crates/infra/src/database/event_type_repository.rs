//! Sqlite implementation of EventTypeRepository

use std::sync::Arc;

use async_trait::async_trait;
use hourglass_core::ports::EventTypeRepository;
use hourglass_domain::{CalendarPreference, EventType, HourglassError, Result};
use rusqlite::Row;

use super::manager::DbManager;
use crate::errors::InfraError;

pub struct SqliteEventTypeRepository {
    db: Arc<DbManager>,
}

impl SqliteEventTypeRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert or replace an event type (setup and tests).
    pub async fn save(&self, event: &EventType) -> Result<()> {
        let db = self.db.clone();
        let event = event.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT OR REPLACE INTO event_types
                     (id, user_id, slug, name, duration_minutes, is_active, calendar_preference)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (
                    &event.id,
                    &event.user_id,
                    &event.slug,
                    &event.name,
                    event.duration_minutes,
                    event.is_active,
                    event.calendar_preference.map(preference_str),
                ),
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }
}

fn preference_str(preference: CalendarPreference) -> &'static str {
    match preference {
        CalendarPreference::Google => "google",
        CalendarPreference::Outlook => "outlook",
        CalendarPreference::Both => "both",
    }
}

const EVENT_COLUMNS: &str =
    "id, user_id, slug, name, duration_minutes, is_active, calendar_preference";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<(EventType, Option<String>)> {
    let preference: Option<String> = row.get(6)?;
    Ok((
        EventType {
            id: row.get(0)?,
            user_id: row.get(1)?,
            slug: row.get(2)?,
            name: row.get(3)?,
            duration_minutes: row.get(4)?,
            is_active: row.get(5)?,
            calendar_preference: None,
        },
        preference,
    ))
}

fn finish_event(partial: (EventType, Option<String>)) -> Result<EventType> {
    let (mut event, preference) = partial;
    event.calendar_preference =
        preference.as_deref().map(CalendarPreference::parse).transpose()?;
    Ok(event)
}

#[async_trait]
impl EventTypeRepository for SqliteEventTypeRepository {
    async fn find_active_by_slug(&self, user_id: &str, slug: &str) -> Result<Option<EventType>> {
        let db = self.db.clone();
        let user_id = user_id.to_owned();
        let slug = slug.to_owned();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let partial = conn
                .query_row(
                    &format!(
                        "SELECT {EVENT_COLUMNS} FROM event_types
                         WHERE user_id = ?1 AND slug = ?2 AND is_active = 1"
                    ),
                    (&user_id, &slug),
                    event_from_row,
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(InfraError::from(other)),
                })?;

            partial.map(finish_event).transpose()
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<EventType>> {
        let db = self.db.clone();
        let id = id.to_owned();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let partial = conn
                .query_row(
                    &format!("SELECT {EVENT_COLUMNS} FROM event_types WHERE id = ?1"),
                    [&id],
                    event_from_row,
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(InfraError::from(other)),
                })?;

            partial.map(finish_event).transpose()
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<EventType>> {
        let db = self.db.clone();
        let user_id = user_id.to_owned();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {EVENT_COLUMNS} FROM event_types WHERE user_id = ?1 ORDER BY slug"
                ))
                .map_err(InfraError::from)?;

            let partials = stmt
                .query_map([&user_id], event_from_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;

            partials.into_iter().map(finish_event).collect()
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }
}
