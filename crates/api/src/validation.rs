//! Request parameter validation
//!
//! Malformed parameters are client errors, distinct from conflicts and
//! never retried.

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_domain::{HourglassError, Result, TimeSlot};

/// `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| HourglassError::InvalidInput(format!("invalid date: {value}")))
}

/// `YYYY-MM` → (year, month).
pub fn parse_month(value: &str) -> Result<(i32, u32)> {
    let parsed = NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
        .map_err(|_| HourglassError::InvalidInput(format!("invalid month: {value}")))?;
    Ok((chrono::Datelike::year(&parsed), chrono::Datelike::month(&parsed)))
}

/// ISO-8601 instant.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| HourglassError::InvalidInput(format!("invalid timestamp: {value}")))
}

/// A `[start, end)` slot from two instant strings; must not be inverted or
/// empty.
pub fn parse_slot(start: &str, end: &str) -> Result<TimeSlot> {
    let slot = TimeSlot::new(parse_instant(start)?, parse_instant(end)?)?;
    if slot.is_empty() {
        return Err(HourglassError::InvalidInput("slot must not be empty".into()));
    }
    Ok(slot)
}

/// Event slugs are lowercase alphanumerics and hyphens.
pub fn validate_slug(value: &str) -> Result<&str> {
    let valid = !value.is_empty()
        && value.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(HourglassError::InvalidInput(format!("invalid event slug: {value}")));
    }
    Ok(value)
}

/// Minimal structural email check: nonempty local part, `@`, a domain with
/// a dot.
pub fn validate_email(value: &str) -> Result<&str> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(HourglassError::InvalidInput(format!("invalid email address: {value}")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_parsing() {
        assert!(parse_date("2026-06-15").is_ok());
        assert!(parse_date("2026-13-01").is_err());
        assert!(parse_date("06/15/2026").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_month_parsing() {
        assert_eq!(parse_month("2026-06").unwrap(), (2026, 6));
        assert!(parse_month("2026-00").is_err());
        assert!(parse_month("2026").is_err());
    }

    #[test]
    fn test_slug_validation() {
        assert!(validate_slug("intro-call").is_ok());
        assert!(validate_slug("call30").is_ok());
        assert!(validate_slug("Intro Call").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("a/b").is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("a.b+c@sub.example.org").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada@nodot").is_err());
        assert!(validate_email("ada@.com").is_err());
        assert!(validate_email("ada smith@example.com").is_err());
    }

    #[test]
    fn test_slot_parsing() {
        let slot =
            parse_slot("2026-06-15T14:00:00Z", "2026-06-15T14:30:00Z").unwrap();
        assert_eq!((slot.end - slot.start).num_minutes(), 30);

        assert!(parse_slot("2026-06-15T14:30:00Z", "2026-06-15T14:00:00Z").is_err());
        assert!(parse_slot("2026-06-15T14:00:00Z", "2026-06-15T14:00:00Z").is_err());
        assert!(parse_slot("yesterday", "2026-06-15T14:00:00Z").is_err());
    }
}
