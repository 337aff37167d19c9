//! Shared runtime utilities for Hourglass crates.
//!
//! - `cache`: the tiered cache (process tier over a durable key-value tier)
//!   with TTL envelopes, approximate counters, and best-effort single-flight
//!   locking, plus the central cache key strategy table.
//! - `sync`: request coalescing and debounce-window batching.
//! - `testing`: clock abstraction for deterministic time-based tests.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod sync;
pub mod testing;

pub use cache::{CacheEntry, CacheStrategy, KvStore, MemoryKvStore, TieredCache};
pub use sync::{Batcher, Coalescer};
pub use testing::{Clock, MockClock, SystemClock};
