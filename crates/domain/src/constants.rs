//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Slot generation
pub const MAX_SLOT_INCREMENT_MINUTES: u32 = 30;
pub const BOOKING_HORIZON_DAYS: i64 = 60;

// Cache TTLs (seconds), one per cached artifact kind
pub const AVAILABILITY_TTL_SECS: u64 = 300;
pub const CALENDAR_TTL_SECS: u64 = 900;
pub const EVENTS_TTL_SECS: u64 = 3600;
pub const BOOKINGS_TTL_SECS: u64 = 60;
pub const SYNC_LOCK_TTL_SECS: u64 = 60;
pub const LAST_SYNC_TTL_SECS: u64 = 300;
pub const API_USAGE_TTL_SECS: u64 = 86400;
pub const RULES_TTL_SECS: u64 = 3600;

// Single-flight lock behavior
pub const LOCK_RETRY_DELAY_MS: u64 = 100;

// Debounce window for grouping near-simultaneous per-date fetches
pub const BATCH_WINDOW_MS: u64 = 10;

// Usage governor defaults
pub const DEFAULT_KV_READ_DAILY_LIMIT: u64 = 100_000;
pub const DEFAULT_KV_WRITE_DAILY_LIMIT: u64 = 1_000;
pub const DEFAULT_DB_QUERY_DAILY_LIMIT: u64 = 1_000;
pub const DEFAULT_EXTERNAL_QUERY_DAILY_LIMIT: u64 = 1_000;
pub const USAGE_WARNING_RATIO: f64 = 0.8;
pub const USAGE_SAMPLE_EVERY: u64 = 100;

// Upstream calendar calls
pub const CALENDAR_REQUEST_TIMEOUT_SECS: u64 = 10;
