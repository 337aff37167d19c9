//! Availability commands

use hourglass_domain::{CalendarPreference, DayAvailability, MonthAvailability, Result};

use crate::context::SchedulerContext;
use crate::validation::{parse_date, parse_month, validate_slug};

/// Open slots for one date (`YYYY-MM-DD`).
pub async fn get_availability(
    ctx: &SchedulerContext,
    event_slug: &str,
    date: &str,
    calendars: Option<&str>,
) -> Result<DayAvailability> {
    let slug = validate_slug(event_slug)?;
    let date = parse_date(date)?;
    let preference = calendars.map(CalendarPreference::parse).transpose()?;

    ctx.availability.compute_availability(slug, date, preference).await
}

/// Dates with at least one open slot in a month (`YYYY-MM`).
pub async fn get_month_availability(
    ctx: &SchedulerContext,
    event_slug: &str,
    month: &str,
    calendars: Option<&str>,
) -> Result<MonthAvailability> {
    let slug = validate_slug(event_slug)?;
    let (year, month) = parse_month(month)?;
    let preference = calendars.map(CalendarPreference::parse).transpose()?;

    ctx.availability.compute_month_availability(slug, year, month, preference).await
}
