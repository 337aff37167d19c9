//! Durable key-value tier port and in-memory implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hourglass_domain::Result;

use crate::testing::{Clock, SystemClock};

/// The durable key-value store the cache is layered over.
///
/// Matches the contract of an edge KV namespace: opaque string keys, string
/// values, optional provider-native expiration. Single-key operations are
/// assumed atomic; nothing here offers multi-key transactions.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, optionally with a native expiration after which the
    /// store itself drops the key.
    async fn put(&self, key: &str, value: String, expiration_ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

struct StoredValue {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process [`KvStore`] with native-TTL emulation.
///
/// Stands in for the edge namespace in local deployments and tests. Expired
/// keys are dropped lazily on read.
pub struct MemoryKvStore {
    entries: DashMap<String, StoredValue>,
    clock: Arc<dyn Clock>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { entries: DashMap::new(), clock }
    }

    /// Number of live (non-expired) keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now_utc();
        self.entries
            .iter()
            .filter(|e| e.value().expires_at.map_or(true, |exp| exp > now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            if let Some(expires_at) = entry.expires_at {
                if expires_at <= self.clock.now_utc() {
                    drop(entry);
                    self.entries.remove(key);
                    return Ok(None);
                }
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, expiration_ttl: Option<Duration>) -> Result<()> {
        let expires_at = expiration_ttl.and_then(|ttl| {
            chrono::Duration::from_std(ttl).ok().map(|d| self.clock.now_utc() + d)
        });
        self.entries.insert(key.to_owned(), StoredValue { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
