//! Time abstraction for testability
//!
//! Provides a trait-based approach to time operations that allows for
//! deterministic testing without relying on actual time passage. Cache
//! envelopes and usage counters persist wall-clock timestamps, so the
//! abstraction deals in `DateTime<Utc>` rather than monotonic instants.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;

/// Trait for time operations to enable testing
pub trait Clock: Send + Sync {
    /// Current wall-clock time in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Milliseconds since the UNIX epoch.
    fn millis_since_epoch(&self) -> i64 {
        self.now_utc().timestamp_millis()
    }

    /// Current UTC calendar date.
    fn today_utc(&self) -> NaiveDate {
        self.now_utc().date_naive()
    }
}

/// Real system clock implementation. Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for deterministic testing
///
/// Starts at a fixed base time and only moves when advanced manually.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use hourglass_common::testing::{Clock, MockClock};
///
/// let clock = MockClock::default();
/// let start = clock.now_utc();
/// clock.advance(Duration::from_secs(301));
/// assert_eq!((clock.now_utc() - start).num_seconds(), 301);
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock pinned to the given instant.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(now)) }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::from_std(delta).unwrap_or_else(|_| chrono::Duration::zero());
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Default for MockClock {
    /// A clock pinned to 2026-01-05 12:00:00 UTC (an arbitrary Monday).
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).single().unwrap_or_else(Utc::now))
    }
}

impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock_advances() {
        let clock = MockClock::default();
        let start = clock.now_utc();
        clock.advance(Duration::from_secs(90));
        assert_eq!((clock.now_utc() - start).num_seconds(), 90);
    }

    #[test]
    fn test_mock_clock_clones_share_time() {
        let clock = MockClock::default();
        let other = clock.clone();
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now_utc(), other.now_utc());
    }

    #[test]
    fn test_millis_since_epoch_tracks_now() {
        let clock = MockClock::default();
        let before = clock.millis_since_epoch();
        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.millis_since_epoch() - before, 1500);
    }
}
