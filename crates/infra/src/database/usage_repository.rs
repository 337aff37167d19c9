//! Sqlite implementation of UsageRepository

use std::sync::Arc;

use async_trait::async_trait;
use hourglass_core::ports::UsageRepository;
use hourglass_domain::{HourglassError, Result, UsageCounter};

use super::manager::DbManager;
use crate::errors::InfraError;

pub struct SqliteUsageRepository {
    db: Arc<DbManager>,
}

impl SqliteUsageRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Read back a persisted snapshot (dashboards and tests).
    pub async fn snapshot(&self, class: &str, date: &str) -> Result<Option<u64>> {
        let db = self.db.clone();
        let class = class.to_owned();
        let date = date.to_owned();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT count FROM api_usage WHERE class = ?1 AND date = ?2",
                (&class, &date),
                |row| row.get::<_, u64>(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(InfraError::from(other).into()),
            })
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }
}

#[async_trait]
impl UsageRepository for SqliteUsageRepository {
    async fn upsert_snapshot(&self, counter: &UsageCounter) -> Result<()> {
        let db = self.db.clone();
        let counter = counter.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO api_usage (date, class, count)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(date, class) DO UPDATE SET count = excluded.count",
                (counter.date.to_string(), counter.class.as_str(), counter.count),
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }
}
