//! Sqlite implementation of HostRepository
//!
//! Single-host deployment: the users table holds exactly one row and every
//! lookup takes the first.

use std::sync::Arc;

use async_trait::async_trait;
use hourglass_core::ports::HostRepository;
use hourglass_domain::{CalendarPreference, HostProfile, HourglassError, Result};

use super::manager::DbManager;
use crate::errors::InfraError;

pub struct SqliteHostRepository {
    db: Arc<DbManager>,
}

impl SqliteHostRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert or replace the host row (setup and tests).
    pub async fn save(&self, host: &HostProfile) -> Result<()> {
        let db = self.db.clone();
        let host = host.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO users (id, email, name, timezone, default_calendar_preference)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     email = excluded.email,
                     name = excluded.name,
                     timezone = excluded.timezone,
                     default_calendar_preference = excluded.default_calendar_preference",
                (
                    &host.id,
                    &host.email,
                    &host.name,
                    &host.timezone,
                    match host.default_calendar_preference {
                        CalendarPreference::Google => "google",
                        CalendarPreference::Outlook => "outlook",
                        CalendarPreference::Both => "both",
                    },
                ),
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }
}

#[async_trait]
impl HostRepository for SqliteHostRepository {
    async fn host(&self) -> Result<Option<HostProfile>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let row = conn
                .query_row(
                    "SELECT id, email, name, timezone, default_calendar_preference
                     FROM users LIMIT 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(InfraError::from(other)),
                })?;

            row.map(|(id, email, name, timezone, preference)| {
                Ok(HostProfile {
                    id,
                    email,
                    name,
                    timezone,
                    default_calendar_preference: CalendarPreference::parse(&preference)?,
                })
            })
            .transpose()
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }
}
