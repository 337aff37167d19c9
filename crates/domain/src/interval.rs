//! Half-open time interval arithmetic
//!
//! All scheduling decisions reduce to comparisons between half-open
//! `[start, end)` intervals on the UTC timeline. Comparisons are always
//! instant-based, never string-based.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{HourglassError, Result};

/// A half-open `[start, end)` interval in UTC.
///
/// Serializes start/end as ISO-8601 instants, which is also the wire shape
/// of a bookable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    /// Build a slot, rejecting inverted bounds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(HourglassError::InvalidInput(format!(
                "interval end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a slot from a start instant and a duration in minutes.
    pub fn from_start(start: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self { start, end: start + Duration::minutes(i64::from(duration_minutes)) }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True iff the intervals share any instant under half-open semantics.
    ///
    /// The general predicate `a.start < b.end && b.start < a.end` covers the
    /// starts-inside, ends-inside, and fully-contains cases in one test.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True iff this slot overlaps any interval in `busy`.
    pub fn conflicts_with_any(&self, busy: &[TimeSlot]) -> bool {
        busy.iter().any(|b| self.overlaps(b))
    }

    /// True iff the slot is empty (`start == end`).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
