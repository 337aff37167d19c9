//! Common data types used throughout the application

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{HourglassError, Result};
use crate::interval::TimeSlot;

/// One weekly availability window owned by the host.
///
/// Times are local wall-clock values in the host's timezone; a user may have
/// several windows on the same weekday (split shifts). The full rule set is
/// replaced wholesale on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRule {
    /// 0 = Sunday … 6 = Saturday
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl AvailabilityRule {
    pub fn new(day_of_week: u8, start_time: NaiveTime, end_time: NaiveTime) -> Result<Self> {
        if day_of_week > 6 {
            return Err(HourglassError::InvalidInput(format!(
                "day_of_week must be 0-6, got {day_of_week}"
            )));
        }
        Ok(Self { day_of_week, start_time, end_time })
    }
}

/// Booking lifecycle states.
///
/// Transitions are monotonic except for reschedule
/// (confirmed → rescheduled → confirmed at the new time); cancellation is
/// terminal from any non-canceled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Canceled,
    Rescheduled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Canceled => "canceled",
            Self::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "confirmed" => Ok(Self::Confirmed),
            "canceled" => Ok(Self::Canceled),
            "rescheduled" => Ok(Self::Rescheduled),
            other => {
                Err(HourglassError::InvalidInput(format!("unknown booking status: {other}")))
            }
        }
    }
}

/// A confirmed (or formerly confirmed) meeting with an external attendee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub event_type_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendee_name: String,
    pub attendee_email: String,
    pub status: BookingStatus,
    /// Identifier of the mirrored event on the host's calendar, when one
    /// was created.
    pub external_event_ref: Option<String>,
}

impl Booking {
    /// The booking's `[start, end)` interval.
    pub fn slot(&self) -> TimeSlot {
        TimeSlot { start: self.start_time, end: self.end_time }
    }
}

/// Which connected calendars feed the busy-time computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarPreference {
    Google,
    Outlook,
    #[default]
    Both,
}

impl CalendarPreference {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "google" => Ok(Self::Google),
            "outlook" => Ok(Self::Outlook),
            "both" => Ok(Self::Both),
            other => Err(HourglassError::InvalidInput(format!(
                "unknown calendar preference: {other}"
            ))),
        }
    }

    pub fn includes(&self, kind: ProviderKind) -> bool {
        match self {
            Self::Both => true,
            Self::Google => kind == ProviderKind::Google,
            Self::Outlook => kind == ProviderKind::Outlook,
        }
    }
}

/// Concrete calendar provider variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Outlook,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Outlook => "outlook",
        }
    }
}

/// A bookable meeting kind exposed under a public slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub id: String,
    pub user_id: String,
    pub slug: String,
    pub name: String,
    pub duration_minutes: u32,
    pub is_active: bool,
    /// Per-event override; `None` falls back to the host default.
    pub calendar_preference: Option<CalendarPreference>,
}

/// The host account (single-host deployment: exactly one row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub timezone: String,
    pub default_calendar_preference: CalendarPreference,
}

/// Operation classes metered by the usage governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageClass {
    KvRead,
    KvWrite,
    DbQuery,
    ExternalQuery,
}

impl UsageClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KvRead => "kv_read",
            Self::KvWrite => "kv_write",
            Self::DbQuery => "db_query",
            Self::ExternalQuery => "external_query",
        }
    }

    pub const ALL: [UsageClass; 4] =
        [Self::KvRead, Self::KvWrite, Self::DbQuery, Self::ExternalQuery];
}

/// One day's worth of a usage counter, mirrored to durable storage on a
/// sampled schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub class: UsageClass,
    pub date: NaiveDate,
    pub count: u64,
}

/// Result of a single-date availability computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub slots: Vec<TimeSlot>,
    /// Set when the response was served from cache past its freshness
    /// window because recomputation was quota-blocked.
    #[serde(default)]
    pub stale: bool,
}

/// Result of a month-wide availability scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthAvailability {
    /// Dates (YYYY-MM-DD) with at least one open slot.
    pub available_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub stale: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_rejects_out_of_range_weekday() {
        let t = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert!(AvailabilityRule::new(7, t, t).is_err());
        assert!(AvailabilityRule::new(6, t, t).is_ok());
    }

    #[test]
    fn test_booking_status_round_trip() {
        for status in [BookingStatus::Confirmed, BookingStatus::Canceled, BookingStatus::Rescheduled]
        {
            assert_eq!(BookingStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(BookingStatus::parse("pending").is_err());
    }

    #[test]
    fn test_calendar_preference_selection() {
        assert!(CalendarPreference::Both.includes(ProviderKind::Google));
        assert!(CalendarPreference::Both.includes(ProviderKind::Outlook));
        assert!(CalendarPreference::Google.includes(ProviderKind::Google));
        assert!(!CalendarPreference::Google.includes(ProviderKind::Outlook));
        assert!(!CalendarPreference::Outlook.includes(ProviderKind::Google));
    }

    #[test]
    fn test_usage_class_wire_names() {
        assert_eq!(UsageClass::KvRead.as_str(), "kv_read");
        assert_eq!(UsageClass::ExternalQuery.as_str(), "external_query");
    }
}
