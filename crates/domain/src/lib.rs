//! # Hourglass Domain
//!
//! Business domain types and models for Hourglass.
//!
//! This crate contains:
//! - Domain data types (AvailabilityRule, Booking, EventType, etc.)
//! - Domain error types and Result definitions
//! - Half-open interval arithmetic and timezone conversion
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Hourglass crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod errors;
pub mod interval;
pub mod types;
pub mod tz;

// Re-export commonly used items
pub use errors::*;
pub use interval::TimeSlot;
pub use types::*;
