//! Tiered caching over a durable key-value store
//!
//! The cache bounds the cost of recomputation: every expensive artifact
//! (availability, calendar busy time, rules, bookings) is stored as a
//! JSON envelope carrying its own timestamp and TTL, so any process sharing
//! the store applies the same freshness rule. Two tiers:
//!
//! - a best-effort in-process tier (moka, volatile), and
//! - the mandatory durable key-value tier (authoritative, TTL-backed).
//!
//! Expiration is advisory and lazy - entries are checked on read and
//! deleted on staleness detection; the store's native TTL is the backstop.
//! All key-value I/O errors are recovered locally: a failed read is a miss,
//! a failed write is a logged no-op. Cache trouble must never surface to a
//! caller that could instead recompute or degrade.
//!
//! Key formats live in [`CacheStrategy`] and are part of the persisted
//! contract: producers and consumers of a cached artifact must agree
//! bit-exactly.

mod entry;
mod kv;
mod strategies;
mod tiered;

pub use entry::CacheEntry;
pub use kv::{KvStore, MemoryKvStore};
pub use strategies::CacheStrategy;
pub use tiered::TieredCache;
