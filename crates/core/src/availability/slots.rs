//! Slot generation: weekly rules ∩ busy time ∩ "now"
//!
//! Pure functions of their inputs; no I/O. A candidate slot survives when it
//! fits inside a rule window (converted to UTC), does not start in the past,
//! and overlaps no busy interval.

use std::cmp::min;
use std::ops::ControlFlow;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use hourglass_domain::constants::MAX_SLOT_INCREMENT_MINUTES;
use hourglass_domain::{tz, AvailabilityRule, Result, TimeSlot};

/// Inputs for generating one day's slots.
#[derive(Debug, Clone)]
pub struct SlotQuery<'a> {
    pub date: NaiveDate,
    /// The host's full rule set; windows for other weekdays are ignored.
    pub rules: &'a [AvailabilityRule],
    pub duration_minutes: u32,
    /// Busy intervals from providers and confirmed bookings, unioned.
    pub busy: &'a [TimeSlot],
    pub now: DateTime<Utc>,
    /// The host's IANA timezone, in which rule times are wall-clock.
    pub timezone: &'a str,
}

/// All bookable slots for the query's date, in chronological order.
pub fn day_slots(query: &SlotQuery<'_>) -> Result<Vec<TimeSlot>> {
    let mut slots = Vec::new();
    walk_candidates(query, |slot| {
        slots.push(slot);
        ControlFlow::Continue(())
    })?;
    Ok(slots)
}

/// Whether the query's date has at least one bookable slot.
///
/// Short-circuits at the first acceptance; month scans call this per day
/// instead of enumerating full slot lists.
pub fn day_has_slot(query: &SlotQuery<'_>) -> Result<bool> {
    let mut found = false;
    walk_candidates(query, |_| {
        found = true;
        ControlFlow::Break(())
    })?;
    Ok(found)
}

/// Walk accepted candidate slots in chronological order, feeding each to
/// `visit` until exhaustion or `visit` breaks.
fn walk_candidates(
    query: &SlotQuery<'_>,
    mut visit: impl FnMut(TimeSlot) -> ControlFlow<()>,
) -> Result<()> {
    if query.duration_minutes == 0 {
        return Ok(());
    }

    let weekday = query.date.weekday().num_days_from_sunday() as u8;
    let increment =
        Duration::minutes(i64::from(min(MAX_SLOT_INCREMENT_MINUTES, query.duration_minutes)));

    // Convert the day's windows to UTC up front and order them; within one
    // window the cursor walk is already monotonic.
    let mut windows = Vec::new();
    for rule in query.rules.iter().filter(|r| r.day_of_week == weekday) {
        let start = tz::local_to_utc(query.date, rule.start_time, query.timezone)?;
        let end = tz::local_to_utc(query.date, rule.end_time, query.timezone)?;
        // An inverted or empty window yields no slots, silently
        windows.push((start, end));
    }
    windows.sort_by_key(|(start, _)| *start);

    for (window_start, window_end) in windows {
        let mut cursor = window_start;
        loop {
            let candidate = TimeSlot::from_start(cursor, query.duration_minutes);

            // Further cursors only get later, so a slot that no longer fits
            // ends this window
            if candidate.end > window_end {
                break;
            }

            // Past slots are skipped, not fatal to the window
            if cursor >= query.now && !candidate.conflicts_with_any(query.busy) {
                if visit(candidate).is_break() {
                    return Ok(());
                }
            }

            cursor += increment;
        }
    }

    Ok(())
}
