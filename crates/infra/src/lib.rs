//! # Hourglass Infra
//!
//! Infrastructure adapters behind the core ports: calendar providers over
//! HTTP, sqlite repositories, OAuth credential refresh, and the
//! tracing-backed notifier.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod calendar;
pub mod database;
pub mod errors;
pub mod notifier;

pub use calendar::credentials::{
    CredentialManager, ProviderCredentials, RefreshTokenStore,
};
pub use calendar::providers::{GoogleCalendarProvider, MicrosoftCalendarProvider};
pub use database::{
    DbManager, SqliteBookingRepository, SqliteEventTypeRepository, SqliteHostRepository,
    SqliteRefreshTokenStore, SqliteRuleRepository, SqliteUsageRepository,
};
pub use errors::InfraError;
pub use notifier::TracingNotifier;
