//! Sqlite persistence behind the core repository ports
//!
//! All queries run on the blocking thread pool; connections come from an
//! r2d2 pool owned by [`DbManager`]. Timestamps are stored as fixed-width
//! UTC RFC 3339 strings (`2026-06-15T14:00:00Z`) so lexicographic SQL
//! comparisons agree with instant ordering.

mod booking_repository;
mod credential_store;
mod event_type_repository;
mod host_repository;
mod manager;
mod rule_repository;
mod usage_repository;

pub use booking_repository::SqliteBookingRepository;
pub use credential_store::SqliteRefreshTokenStore;
pub use event_type_repository::SqliteEventTypeRepository;
pub use host_repository::SqliteHostRepository;
pub use manager::DbManager;
pub use rule_repository::SqliteRuleRepository;
pub use usage_repository::SqliteUsageRepository;

use chrono::{DateTime, SecondsFormat, Utc};
use hourglass_domain::{HourglassError, Result};

/// Canonical stored form of an instant.
pub(crate) fn store_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| HourglassError::Database(format!("invalid stored timestamp {value}: {e}")))
}
