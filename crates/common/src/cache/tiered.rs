//! Two-tier cache with TTL envelopes and best-effort single-flight locking

use std::sync::Arc;
use std::time::Duration;

use hourglass_domain::constants::LOCK_RETRY_DELAY_MS;
use hourglass_domain::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::entry::CacheEntry;
use super::kv::KvStore;
use super::strategies::CacheStrategy;
use crate::testing::{Clock, SystemClock};

/// Upper bound on process-tier residency; the envelope timestamp remains
/// the freshness authority, so this only caps memory growth.
const LOCAL_TIER_CAPACITY: u64 = 10_000;
const LOCAL_TIER_TTL: Duration = Duration::from_secs(60);

/// Layered cache: an optional moka process tier in front of the durable
/// key-value tier.
///
/// The durable tier is authoritative. The process tier is best-effort and
/// volatile; it only ever holds envelope strings that were (or are being)
/// written to the durable tier, and every read re-validates the envelope
/// against the clock.
pub struct TieredCache {
    kv: Arc<dyn KvStore>,
    local: Option<moka::future::Cache<String, String>>,
    clock: Arc<dyn Clock>,
}

impl TieredCache {
    /// Cache with both tiers and the system clock.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self::with_clock(kv, Arc::new(SystemClock))
    }

    /// Cache with both tiers and an injected clock (useful for testing).
    pub fn with_clock(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        let local = moka::future::Cache::builder()
            .max_capacity(LOCAL_TIER_CAPACITY)
            .time_to_live(LOCAL_TIER_TTL)
            .build();
        Self { kv, local: Some(local), clock }
    }

    /// Cache with the durable tier only.
    pub fn without_local_tier(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, local: None, clock }
    }

    /// Read a cached value, applying the envelope freshness rule.
    ///
    /// Returns `None` on miss, on staleness (the durable entry is deleted on
    /// detection), and on any I/O or decode failure - cache trouble is never
    /// an error for the caller.
    pub async fn get<T: DeserializeOwned>(&self, strategy: &CacheStrategy) -> Option<T> {
        let now_ms = self.clock.millis_since_epoch();

        if let Some(local) = &self.local {
            if let Some(raw) = local.get(&strategy.key).await {
                match decode_envelope::<T>(&raw) {
                    Some(entry) if entry.is_fresh(now_ms) => return Some(entry.data),
                    _ => local.invalidate(&strategy.key).await,
                }
            }
        }

        let raw = match self.kv.get(&strategy.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %strategy.key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match decode_envelope::<T>(&raw) {
            Some(entry) if entry.is_fresh(now_ms) => {
                if let Some(local) = &self.local {
                    local.insert(strategy.key.clone(), raw).await;
                }
                Some(entry.data)
            }
            _ => {
                // Stale or undecodable: lazily drop it; the store's native
                // TTL is the backstop if this delete fails
                self.delete(&strategy.key).await;
                None
            }
        }
    }

    /// Write a value under the strategy's key and TTL.
    ///
    /// The envelope goes to the durable tier with the store's native
    /// expiration matching the TTL, and to the process tier. Failures are
    /// logged no-ops.
    pub async fn set<T: Serialize>(&self, strategy: &CacheStrategy, data: &T) {
        let entry = CacheEntry::new(data, self.clock.millis_since_epoch(), strategy.ttl_secs);
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %strategy.key, error = %e, "cache entry not serializable, skipping");
                return;
            }
        };

        if let Err(e) = self
            .kv
            .put(&strategy.key, raw.clone(), Some(Duration::from_secs(strategy.ttl_secs)))
            .await
        {
            warn!(key = %strategy.key, error = %e, "cache write failed");
        }

        if let Some(local) = &self.local {
            local.insert(strategy.key.clone(), raw).await;
        }
    }

    /// Remove a key from both tiers. Failures are logged no-ops.
    pub async fn delete(&self, key: &str) {
        if let Some(local) = &self.local {
            local.invalidate(key).await;
        }
        if let Err(e) = self.kv.delete(key).await {
            warn!(key, error = %e, "cache delete failed");
        }
    }

    /// Read-modify-write counter under the strategy's key.
    ///
    /// Not atomic against races in the underlying store - two concurrent
    /// increments can observe the same prior value. Acceptable for
    /// approximate usage metering, never for correctness-critical counts.
    /// Returns 0 when the store is unreachable.
    pub async fn increment(&self, strategy: &CacheStrategy) -> u64 {
        let current = match self.kv.get(&strategy.key).await {
            Ok(value) => value.and_then(|s| s.parse::<u64>().ok()).unwrap_or(0),
            Err(e) => {
                warn!(key = %strategy.key, error = %e, "counter read failed");
                return 0;
            }
        };

        let next = current + 1;
        if let Err(e) = self
            .kv
            .put(&strategy.key, next.to_string(), Some(Duration::from_secs(strategy.ttl_secs)))
            .await
        {
            warn!(key = %strategy.key, error = %e, "counter write failed");
            return 0;
        }
        next
    }

    /// Read a raw counter value without incrementing.
    pub async fn counter_value(&self, strategy: &CacheStrategy) -> u64 {
        match self.kv.get(&strategy.key).await {
            Ok(value) => value.and_then(|s| s.parse::<u64>().ok()).unwrap_or(0),
            Err(e) => {
                warn!(key = %strategy.key, error = %e, "counter read failed");
                0
            }
        }
    }

    /// Fetch-through with a best-effort single-flight lock.
    ///
    /// Checks the data key first; on miss, inspects the lock key. If the
    /// lock is held, waits [`LOCK_RETRY_DELAY_MS`] and rechecks the data key
    /// exactly once (no spin loop) - `Ok(None)` means another flight is
    /// still computing. Otherwise acquires the lock, runs `fetcher`, stores
    /// the result, and releases the lock on every exit path including
    /// fetcher failure. A holder that dies before releasing is covered by
    /// the lock key's TTL.
    ///
    /// This reduces thundering-herd recomputation; it is not a mutex. Two
    /// callers racing past the lock check can both run `fetcher`.
    pub async fn get_with_lock<T, F, Fut>(
        &self,
        data_strategy: &CacheStrategy,
        lock_strategy: &CacheStrategy,
        fetcher: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        if let Some(cached) = self.get::<T>(data_strategy).await {
            return Ok(Some(cached));
        }

        if self.get::<bool>(lock_strategy).await.is_some() {
            debug!(key = %data_strategy.key, "lock held, waiting for peer flight");
            tokio::time::sleep(Duration::from_millis(LOCK_RETRY_DELAY_MS)).await;
            return Ok(self.get::<T>(data_strategy).await);
        }

        self.set(lock_strategy, &true).await;

        let result = fetcher().await;
        match result {
            Ok(value) => {
                self.set(data_strategy, &value).await;
                self.delete(&lock_strategy.key).await;
                Ok(Some(value))
            }
            Err(e) => {
                self.delete(&lock_strategy.key).await;
                Err(e)
            }
        }
    }
}

fn decode_envelope<T: DeserializeOwned>(raw: &str) -> Option<CacheEntry<T>> {
    serde_json::from_str(raw).ok()
}

#[cfg(test)]
mod tests {
    //! Unit tests for the tiered cache.
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use hourglass_domain::HourglassError;

    use super::*;
    use crate::cache::MemoryKvStore;
    use crate::testing::MockClock;

    fn cache_with_clock() -> (TieredCache, MockClock, Arc<MemoryKvStore>) {
        let clock = MockClock::default();
        let kv = Arc::new(MemoryKvStore::with_clock(Arc::new(clock.clone())));
        let cache = TieredCache::with_clock(kv.clone(), Arc::new(clock.clone()));
        (cache, clock, kv)
    }

    fn strategy(key: &str, ttl_secs: u64) -> CacheStrategy {
        CacheStrategy { key: key.to_owned(), ttl_secs }
    }

    /// An entry written with ttl=300 is readable at t0+299s and gone at
    /// t0+301s.
    #[tokio::test]
    async fn test_ttl_boundary() {
        let (cache, clock, _) = cache_with_clock();
        let s = strategy("availability:intro:2026-01-05", 300);

        cache.set(&s, &vec![1, 2, 3]).await;

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get::<Vec<i32>>(&s).await, Some(vec![1, 2, 3]));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get::<Vec<i32>>(&s).await, None);
    }

    /// Staleness detection deletes the durable entry.
    #[tokio::test]
    async fn test_stale_entry_lazily_deleted() {
        let (cache, clock, kv) = cache_with_clock();
        // Envelope TTL shorter than the store-native TTL so the envelope
        // check is what expires the entry
        let s = strategy("rules:u1", 10);

        cache.set(&s, &"windows").await;
        clock.advance(Duration::from_secs(11));

        assert_eq!(cache.get::<String>(&s).await, None);
        assert_eq!(kv.get(&s.key).await.unwrap(), None);
    }

    /// Undecodable payloads behave as a miss and are dropped.
    #[tokio::test]
    async fn test_garbage_payload_is_a_miss() {
        let (cache, _, kv) = cache_with_clock();
        let s = strategy("events:u1", 3600);

        kv.put(&s.key, "not json".into(), None).await.unwrap();
        assert_eq!(cache.get::<Vec<String>>(&s).await, None);
        assert_eq!(kv.get(&s.key).await.unwrap(), None);
    }

    /// A failing store makes reads miss and writes no-op, never error.
    #[tokio::test]
    async fn test_kv_failures_are_recovered() {
        struct BrokenKv;

        #[async_trait]
        impl KvStore for BrokenKv {
            async fn get(&self, _: &str) -> Result<Option<String>> {
                Err(HourglassError::CacheIo("kv down".into()))
            }
            async fn put(&self, _: &str, _: String, _: Option<Duration>) -> Result<()> {
                Err(HourglassError::CacheIo("kv down".into()))
            }
            async fn delete(&self, _: &str) -> Result<()> {
                Err(HourglassError::CacheIo("kv down".into()))
            }
        }

        let cache = TieredCache::without_local_tier(Arc::new(BrokenKv), Arc::new(MockClock::default()));
        let s = strategy("bookings:2026-01-05", 60);

        cache.set(&s, &vec!["b1"]).await; // logged no-op
        assert_eq!(cache.get::<Vec<String>>(&s).await, None);
        assert_eq!(cache.increment(&s).await, 0);
    }

    #[tokio::test]
    async fn test_increment_counts_up_and_expires() {
        let (cache, clock, _) = cache_with_clock();
        let s = strategy("api-usage:kv_read:2026-01-05", 86400);

        assert_eq!(cache.increment(&s).await, 1);
        assert_eq!(cache.increment(&s).await, 2);
        assert_eq!(cache.counter_value(&s).await, 2);

        // Day rollover: the counter's native TTL clears it
        clock.advance(Duration::from_secs(86_401));
        assert_eq!(cache.increment(&s).await, 1);
    }

    #[tokio::test]
    async fn test_get_with_lock_populates_and_releases() {
        let (cache, _, kv) = cache_with_clock();
        let data = strategy("availability:intro:2026-01-06", 300);
        let lock = strategy("sync-lock:u1", 60);

        let result = cache
            .get_with_lock(&data, &lock, || async { Ok::<_, HourglassError>(vec![7u32]) })
            .await
            .unwrap();

        assert_eq!(result, Some(vec![7]));
        assert_eq!(kv.get(&lock.key).await.unwrap(), None, "lock released");
        assert_eq!(cache.get::<Vec<u32>>(&data).await, Some(vec![7]));
    }

    #[tokio::test]
    async fn test_get_with_lock_releases_on_fetcher_error() {
        let (cache, _, kv) = cache_with_clock();
        let data = strategy("availability:intro:2026-01-07", 300);
        let lock = strategy("sync-lock:u1", 60);

        let result: Result<Option<u32>> = cache
            .get_with_lock(&data, &lock, || async {
                Err(HourglassError::Upstream("calendar down".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(kv.get(&lock.key).await.unwrap(), None, "lock released on error");
    }

    #[tokio::test]
    async fn test_get_with_lock_skips_fetch_on_hit() {
        let (cache, _, _) = cache_with_clock();
        let data = strategy("availability:intro:2026-01-08", 300);
        let lock = strategy("sync-lock:u1", 60);
        let calls = AtomicU32::new(0);

        cache.set(&data, &1u32).await;
        let result = cache
            .get_with_lock(&data, &lock, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, HourglassError>(2u32)
            })
            .await
            .unwrap();

        assert_eq!(result, Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Two concurrent flights for the same uncached key: the lock is
    /// best-effort, so the fetcher may run twice, but never unbounded.
    #[tokio::test]
    async fn test_concurrent_get_with_lock_is_bounded() {
        let (cache, _, _) = cache_with_clock();
        let cache = Arc::new(cache);
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                let data = strategy("availability:intro:2026-01-10", 300);
                let lock = strategy("sync-lock:u1", 60);
                cache
                    .get_with_lock(&data, &lock, || {
                        let calls = Arc::clone(&calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, HourglassError>(11u32)
                        }
                    })
                    .await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            // A peer that lost the race and found nothing yet gets None;
            // anything else must be the computed value
            assert!(result.is_none() || result == Some(11));
        }
        assert!(
            (1..=2).contains(&calls.load(Ordering::SeqCst)),
            "single-flight is approximate: at most one duplicate"
        );
    }

    /// With the lock already held, the caller waits once, rechecks, and
    /// comes back empty-handed rather than recomputing.
    #[tokio::test]
    async fn test_get_with_lock_defers_to_held_lock() {
        let (cache, _, _) = cache_with_clock();
        let data = strategy("availability:intro:2026-01-09", 300);
        let lock = strategy("sync-lock:u1", 60);
        let calls = AtomicU32::new(0);

        cache.set(&lock, &true).await;

        let result = cache
            .get_with_lock(&data, &lock, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, HourglassError>(9u32)
            })
            .await
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "fetcher must not run while locked");
    }
}
