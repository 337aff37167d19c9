//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Hourglass
///
/// Variants map onto the recovery policy at the availability boundary:
/// `Upstream` and `CacheIo` are recovered locally (empty contribution /
/// cache miss), `QuotaExceeded` triggers stale serving, `InvalidInput` and
/// `Conflict` surface to the caller as client errors.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum HourglassError {
    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Usage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Cache I/O error: {0}")]
    CacheIo(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HourglassError {
    /// Whether the condition is safe to retry after a backoff.
    ///
    /// Quota exhaustion clears at the day rollover and upstream failures are
    /// transient; validation and conflict errors are not retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_) | Self::Upstream(_) | Self::CacheIo(_))
    }
}

/// Result type alias for Hourglass operations
pub type Result<T> = std::result::Result<T, HourglassError>;
