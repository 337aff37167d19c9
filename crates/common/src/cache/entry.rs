//! TTL envelope wrapped around every cached value

use serde::{Deserialize, Serialize};

/// A cached value with its creation timestamp and time-to-live.
///
/// Valid iff `now - timestamp <= ttl * 1000`. The envelope is what gets
/// serialized into the durable store, so staleness can be judged by any
/// reader without out-of-band metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Milliseconds since the UNIX epoch at write time.
    pub timestamp: i64,
    /// Freshness window in seconds.
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, timestamp_ms: i64, ttl_secs: u64) -> Self {
        Self { data, timestamp: timestamp_ms, ttl: ttl_secs }
    }

    /// Whether the entry is still within its freshness window at `now_ms`.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) <= (self.ttl as i64).saturating_mul(1000)
    }
}
