//! Conversions from external infrastructure errors into domain errors.

use hourglass_domain::HourglassError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub HourglassError);

impl From<InfraError> for HourglassError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<HourglassError> for InfraError {
    fn from(value: HourglassError) -> Self {
        InfraError(value)
    }
}

impl From<SqlError> for InfraError {
    fn from(error: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let domain = match error {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => {
                        HourglassError::Database("database is busy".into())
                    }
                    ErrorCode::DatabaseLocked => {
                        HourglassError::Database("database is locked".into())
                    }
                    ErrorCode::ConstraintViolation => {
                        HourglassError::Database(format!("constraint violation: {message}"))
                    }
                    _ => HourglassError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                HourglassError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                HourglassError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                HourglassError::Database(format!("invalid column type: {ty}"))
            }
            other => HourglassError::Database(other.to_string()),
        };
        InfraError(domain)
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(error: r2d2::Error) -> Self {
        InfraError(HourglassError::Database(format!("connection pool error: {error}")))
    }
}

impl From<HttpError> for InfraError {
    fn from(error: HttpError) -> Self {
        let domain = if error.is_timeout() {
            HourglassError::Upstream(format!("request timed out: {error}"))
        } else if error.is_connect() {
            HourglassError::Upstream(format!("connection failed: {error}"))
        } else if error.is_decode() {
            HourglassError::Upstream(format!("malformed upstream response: {error}"))
        } else {
            HourglassError::Upstream(error.to_string())
        };
        InfraError(domain)
    }
}
