//! # Hourglass Core
//!
//! Business logic behind port traits: slot generation, availability
//! orchestration with caching and quota degradation, booking lifecycle,
//! and the usage governor. Infrastructure (HTTP providers, SQL
//! repositories, the durable key-value store) plugs in through the traits
//! in [`ports`].

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod availability;
pub mod booking;
pub mod monitor;
pub mod ports;

pub use availability::{AvailabilityService, SlotQuery, WeekBusy};
pub use booking::{BookingService, NewBooking};
pub use monitor::{ClassUsage, DailyLimits, MonitorConfig, UsageMonitor, UsageStats};
