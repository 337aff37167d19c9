//! Sqlite-backed refresh token storage
//!
//! Refresh tokens live on the host's user row, one column per provider.

use std::sync::Arc;

use async_trait::async_trait;
use hourglass_domain::{HourglassError, ProviderKind, Result};

use super::manager::DbManager;
use crate::calendar::credentials::RefreshTokenStore;
use crate::errors::InfraError;

fn token_column(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Google => "google_refresh_token",
        ProviderKind::Outlook => "outlook_refresh_token",
    }
}

pub struct SqliteRefreshTokenStore {
    db: Arc<DbManager>,
}

impl SqliteRefreshTokenStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RefreshTokenStore for SqliteRefreshTokenStore {
    async fn refresh_token(&self, user_id: &str, kind: ProviderKind) -> Result<Option<String>> {
        let db = self.db.clone();
        let user_id = user_id.to_owned();
        let column = token_column(kind);
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {column} FROM users WHERE id = ?1"),
                [&user_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(InfraError::from(other).into()),
            })
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn store_refresh_token(
        &self,
        user_id: &str,
        kind: ProviderKind,
        token: &str,
    ) -> Result<()> {
        let db = self.db.clone();
        let user_id = user_id.to_owned();
        let token = token.to_owned();
        let column = token_column(kind);
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                &format!("UPDATE users SET {column} = ?2 WHERE id = ?1"),
                (&user_id, &token),
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }
}
