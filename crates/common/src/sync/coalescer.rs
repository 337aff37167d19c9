//! Per-key single-flight deduplication of in-flight fetches

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use hourglass_domain::Result;
use tracing::debug;

type InFlight<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Deduplicates identical in-flight fetches by key.
///
/// The first caller for a key starts the fetch; concurrent callers for the
/// same key await the same execution and receive clones of its outcome.
/// The flight is deregistered as soon as it settles - success or failure -
/// so the next call always re-fetches. At most one execution per key runs
/// at any instant.
///
/// One coalescer instance serves one value type; construct it inside the
/// owning service rather than as ambient global state.
pub struct Coalescer<T: Clone> {
    inflight: DashMap<String, InFlight<T>>,
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { inflight: DashMap::new() }
    }

    /// Run `make()` under single-flight semantics for `key`.
    ///
    /// If a flight for `key` is already registered, its shared future is
    /// awaited instead and `make` is never called.
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>> + Send + 'static,
    {
        let flight = match self.inflight.entry(key.to_owned()) {
            Entry::Occupied(existing) => {
                debug!(key, "joining in-flight fetch");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                let flight = make().boxed().shared();
                slot.insert(flight.clone());
                flight
            }
        };

        let outcome = flight.clone().await;
        // Whoever observes completion first deregisters the flight; ptr_eq
        // guards against removing a newer flight registered under the same
        // key in the meantime
        self.inflight.remove_if(key, |_, registered| registered.ptr_eq(&flight));
        outcome
    }

    /// Number of currently registered flights.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }
}

impl<T> Default for Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the coalescer.
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use hourglass_domain::HourglassError;

    use super::*;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_execution() {
        let coalescer = Arc::new(Coalescer::<u32>::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coalescer = Arc::clone(&coalescer);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                coalescer
                    .run("slots:2026-01-05", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.in_flight(), 0, "flight deregistered after completion");
    }

    #[tokio::test]
    async fn test_result_is_not_cached_after_completion() {
        let coalescer = Coalescer::<u32>::new();
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let n = coalescer
                .run("k", || {
                    let count = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Ok(count) }
                })
                .await
                .unwrap();
            assert_eq!(n, calls.load(Ordering::SeqCst));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3, "sequential calls each re-fetch");
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_deregistered() {
        let coalescer = Arc::new(Coalescer::<u32>::new());

        let failing = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move {
                coalescer
                    .run("k", || async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Err(HourglassError::Upstream("boom".into()))
                    })
                    .await
            })
        };
        let joined = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                coalescer.run("k", || async { Ok(1) }).await
            })
        };

        assert!(failing.await.unwrap().is_err());
        assert!(joined.await.unwrap().is_err(), "joiner shares the failure");

        // A fresh call after settlement runs its own fetcher
        let after = coalescer.run("k", || async { Ok(7) }).await.unwrap();
        assert_eq!(after, 7);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_coalesce() {
        let coalescer = Arc::new(Coalescer::<u32>::new());
        let calls = Arc::new(AtomicU32::new(0));

        let a = {
            let (c, n) = (Arc::clone(&coalescer), Arc::clone(&calls));
            tokio::spawn(async move {
                c.run("a", move || async move {
                    n.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(0)
                })
                .await
            })
        };
        let b = {
            let (c, n) = (Arc::clone(&coalescer), Arc::clone(&calls));
            tokio::spawn(async move {
                c.run("b", move || async move {
                    n.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(1)
                })
                .await
            })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
