//! Connection pool and schema management

use hourglass_domain::Result;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::errors::InfraError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    name TEXT NOT NULL,
    timezone TEXT NOT NULL DEFAULT 'UTC',
    default_calendar_preference TEXT NOT NULL DEFAULT 'both',
    google_refresh_token TEXT,
    outlook_refresh_token TEXT
);

CREATE TABLE IF NOT EXISTS availability_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES users(id),
    day_of_week INTEGER NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rules_user_day ON availability_rules(user_id, day_of_week);

CREATE TABLE IF NOT EXISTS event_types (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    slug TEXT NOT NULL,
    name TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    calendar_preference TEXT,
    UNIQUE (user_id, slug)
);

CREATE TABLE IF NOT EXISTS bookings (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    event_type_id TEXT NOT NULL REFERENCES event_types(id),
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    attendee_name TEXT NOT NULL,
    attendee_email TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'confirmed',
    external_event_ref TEXT
);
CREATE INDEX IF NOT EXISTS idx_bookings_user_start ON bookings(user_id, start_time);

CREATE TABLE IF NOT EXISTS api_usage (
    date TEXT NOT NULL,
    class TEXT NOT NULL,
    count INTEGER NOT NULL,
    PRIMARY KEY (date, class)
);
"#;

/// Owns the sqlite connection pool and applies the schema on startup.
pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
}

impl DbManager {
    /// Open (creating if needed) the database at `path`.
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(8).build(manager).map_err(InfraError::from)?;
        let db = Self { pool };
        db.apply_schema()?;
        Ok(db)
    }

    /// A private in-memory database; pool size 1 so every caller sees the
    /// same memory. Test use.
    pub fn in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(InfraError::from)?;
        let db = Self { pool };
        db.apply_schema()?;
        Ok(db)
    }

    pub fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get().map_err(InfraError::from)?)
    }

    fn apply_schema(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA).map_err(InfraError::from)?;
        Ok(())
    }
}
