//! Request coalescing and batching
//!
//! Two complementary ways to collapse duplicate work under concurrency:
//! the [`Coalescer`] shares one in-flight execution among identical
//! concurrent requests, and the [`Batcher`] folds near-simultaneous item
//! requests into a single processor call behind a short debounce window.
//! Neither caches results - pair them with the cache layer when the outcome
//! should outlive the flight.

mod batcher;
mod coalescer;

pub use batcher::{BatchProcessor, Batcher};
pub use coalescer::Coalescer;
