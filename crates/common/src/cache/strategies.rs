//! Central table of cache key strategies
//!
//! Every cached artifact kind has exactly one key format and TTL, defined
//! here so producers and consumers cannot drift. The formats are persisted
//! into the shared store and must be reproduced bit-exactly by any process
//! reading it.

use chrono::NaiveDate;
use hourglass_domain::constants::{
    API_USAGE_TTL_SECS, AVAILABILITY_TTL_SECS, BOOKINGS_TTL_SECS, CALENDAR_TTL_SECS,
    EVENTS_TTL_SECS, LAST_SYNC_TTL_SECS, RULES_TTL_SECS, SYNC_LOCK_TTL_SECS,
};
use hourglass_domain::UsageClass;

/// A cache key paired with the TTL every writer of that key must use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStrategy {
    pub key: String,
    pub ttl_secs: u64,
}

impl CacheStrategy {
    /// `availability:{slug}:{date}` - computed day slots, 5 minutes.
    pub fn availability(event_slug: &str, date: NaiveDate) -> Self {
        Self { key: format!("availability:{event_slug}:{date}"), ttl_secs: AVAILABILITY_TTL_SECS }
    }

    /// `availability:month:{slug}:{month}` - month scan, 5 minutes.
    /// `month` is `YYYY-MM`.
    pub fn month_availability(event_slug: &str, month: &str) -> Self {
        Self {
            key: format!("availability:month:{event_slug}:{month}"),
            ttl_secs: AVAILABILITY_TTL_SECS,
        }
    }

    /// `calendar:{user}:{iso_week}` - provider busy time, 15 minutes.
    pub fn calendar(user_id: &str, week_key: &str) -> Self {
        Self { key: format!("calendar:{user_id}:{week_key}"), ttl_secs: CALENDAR_TTL_SECS }
    }

    /// `events:{user}` - event type listing, 1 hour.
    pub fn events(user_id: &str) -> Self {
        Self { key: format!("events:{user_id}"), ttl_secs: EVENTS_TTL_SECS }
    }

    /// `bookings:{date}` - confirmed bookings for a date, 1 minute.
    pub fn bookings(date: NaiveDate) -> Self {
        Self { key: format!("bookings:{date}"), ttl_secs: BOOKINGS_TTL_SECS }
    }

    /// `sync-lock:{user}` - single-flight lock key, 1 minute.
    ///
    /// The TTL doubles as the crash backstop: a holder that dies without
    /// releasing leaves the lock for at most this long.
    pub fn sync_lock(user_id: &str) -> Self {
        Self { key: format!("sync-lock:{user_id}"), ttl_secs: SYNC_LOCK_TTL_SECS }
    }

    /// `lastsync:{user}` - last provider sync watermark, 5 minutes.
    pub fn last_sync(user_id: &str) -> Self {
        Self { key: format!("lastsync:{user_id}"), ttl_secs: LAST_SYNC_TTL_SECS }
    }

    /// `api-usage:{class}:{date}` - daily usage counter, 24 hours.
    pub fn api_usage(class: UsageClass, date: NaiveDate) -> Self {
        Self { key: format!("api-usage:{}:{date}", class.as_str()), ttl_secs: API_USAGE_TTL_SECS }
    }

    /// `rules:{user}` - weekly availability rules, 1 hour.
    pub fn rules(user_id: &str) -> Self {
        Self { key: format!("rules:{user_id}"), ttl_secs: RULES_TTL_SECS }
    }
}
