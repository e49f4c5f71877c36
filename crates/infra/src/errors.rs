//! Conversions from external infrastructure errors into domain errors.

use cadence_domain::CadenceError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CadenceError);

impl From<InfraError> for CadenceError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CadenceError> for InfraError {
    fn from(value: CadenceError) -> Self {
        InfraError(value)
    }
}

impl From<rusqlite::Error> for InfraError {
    fn from(value: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let message = match value {
            RE::SqliteFailure(err, maybe_message) => {
                let detail = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => "database is busy".to_string(),
                    ErrorCode::DatabaseLocked => "database is locked".to_string(),
                    ErrorCode::ConstraintViolation => {
                        format!("constraint violation: {detail}")
                    }
                    _ => format!("sqlite failure: {detail}"),
                }
            }
            other => other.to_string(),
        };
        InfraError(CadenceError::Database(message))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(CadenceError::Database(format!("pool error: {value}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(CadenceError::Database(format!("column serialization: {value}")))
    }
}
