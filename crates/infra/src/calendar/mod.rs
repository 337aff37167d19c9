//! Calendar provider integrations
//!
//! Google-style and Outlook-style busy-time sources behind the
//! `BusyCalendarProvider` port, plus refresh-token credential management.
//! Both providers normalize timestamps to UTC and filter to busy/tentative
//! statuses; callers treat any provider error as an empty contribution.

pub mod credentials;
pub mod providers;

use std::time::Duration;

use hourglass_domain::constants::CALENDAR_REQUEST_TIMEOUT_SECS;

/// HTTP client with the bounded timeout every upstream calendar call gets;
/// expiry surfaces as a provider failure like any other.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(CALENDAR_REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_default()
}
