//! Wall-clock to UTC conversion for availability rules
//!
//! Availability rules carry local wall-clock times (`HH:MM` in the host's
//! timezone); everything downstream compares UTC instants. The conversion
//! must resolve the zone offset at the instant in question, which makes DST
//! transition days the interesting cases:
//!
//! - On a spring-forward gap the wall-clock time does not exist; the instant
//!   is shifted forward across the gap.
//! - On a fall-back fold the wall-clock time exists twice; the earlier
//!   offset wins.
//!
//! Offset corrections are clamped to ±12h so a trial instant that lands on
//! the wrong side of midnight never wraps a full day.

use chrono::{Datelike, DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::{HourglassError, Result};

/// Parse an IANA timezone name.
pub fn parse_zone(tz_name: &str) -> Result<Tz> {
    tz_name
        .parse::<Tz>()
        .map_err(|_| HourglassError::InvalidInput(format!("unknown timezone: {tz_name}")))
}

/// Convert a local wall-clock date+time in the named zone to a UTC instant.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, tz_name: &str) -> Result<DateTime<Utc>> {
    let zone = parse_zone(tz_name)?;
    let naive = date.and_time(time);

    match zone.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        // Fold: the earlier of the two candidate offsets
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        // Gap: resolve by observing the zone's offset at a trial instant and
        // correcting, which lands the result just past the transition
        LocalResult::None => Ok(resolve_gap(&zone, naive)),
    }
}

/// Map a nonexistent wall-clock time (DST gap) onto the UTC timeline.
///
/// Interprets the wall-clock value as UTC, observes what local time the zone
/// reports at that instant, and corrects by the delta. The correction is
/// clamped to ±12h to stay within the same calendar day.
fn resolve_gap(zone: &Tz, naive: chrono::NaiveDateTime) -> DateTime<Utc> {
    let trial = Utc.from_utc_datetime(&naive);
    let observed = trial.with_timezone(zone).naive_local();

    let mut offset_minutes = (observed - naive).num_minutes();
    if offset_minutes > 12 * 60 {
        offset_minutes -= 24 * 60;
    }
    if offset_minutes < -12 * 60 {
        offset_minutes += 24 * 60;
    }

    trial - Duration::minutes(offset_minutes)
}

/// ISO-week cache key component for a date, e.g. `2026-W38`.
///
/// Calendar busy time is fetched and cached at week granularity; this key
/// must stay stable for any process sharing the store.
pub fn week_key(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{}", iso.year(), iso.week())
}

#[cfg(test)]
mod tests {
    //! Unit tests for timezone conversion.
    use chrono::NaiveDate;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, min, 0).unwrap()
    }

    /// 09:00 America/New_York in June is EDT (UTC-4) → 13:00Z.
    #[test]
    fn test_new_york_summer_offset() {
        let utc = local_to_utc(date(2026, 6, 15), time(9, 0), "America/New_York").unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-06-15T13:00:00+00:00");
    }

    /// 09:00 America/New_York in January is EST (UTC-5) → 14:00Z.
    #[test]
    fn test_new_york_winter_offset() {
        let utc = local_to_utc(date(2026, 1, 12), time(9, 0), "America/New_York").unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-01-12T14:00:00+00:00");
    }

    /// 2026-03-08 02:30 does not exist in America/New_York (spring forward
    /// skips 02:00–03:00); the conversion shifts across the gap instead of
    /// erroring.
    #[test]
    fn test_spring_forward_gap_resolves() {
        let utc = local_to_utc(date(2026, 3, 8), time(2, 30), "America/New_York").unwrap();
        // Landed past the transition: between 06:30Z (02:30 EST would-be)
        // and 07:30Z (03:30 EDT)
        let lower = Utc.with_ymd_and_hms(2026, 3, 8, 6, 30, 0).unwrap();
        let upper = Utc.with_ymd_and_hms(2026, 3, 8, 7, 30, 0).unwrap();
        assert!(utc >= lower && utc <= upper, "got {utc}");
    }

    /// 2026-11-01 01:30 occurs twice in America/New_York (fall back); the
    /// earlier offset (EDT, UTC-4) wins → 05:30Z.
    #[test]
    fn test_fall_back_fold_takes_earliest() {
        let utc = local_to_utc(date(2026, 11, 1), time(1, 30), "America/New_York").unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-11-01T05:30:00+00:00");
    }

    #[test]
    fn test_utc_zone_is_identity() {
        let utc = local_to_utc(date(2026, 5, 1), time(12, 0), "UTC").unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_unknown_zone_is_invalid_input() {
        let result = local_to_utc(date(2026, 5, 1), time(12, 0), "Mars/Olympus_Mons");
        assert!(matches!(result, Err(HourglassError::InvalidInput(_))));
    }

    #[test]
    fn test_week_key_format() {
        assert_eq!(week_key(date(2026, 9, 14)), "2026-W38");
        // ISO week years differ from calendar years at the boundary:
        // 2027-01-01 falls in ISO week 53 of 2026.
        assert_eq!(week_key(date(2027, 1, 1)), "2026-W53");
    }
}
