//! Centralized error types for the forecaster workspace.
//!
//! `ForecastError` is the closed taxonomy every resolution ends in. Each
//! variant carries a fixed outward status and a client-safe message; the
//! `Display` output keeps the internal detail for logs.

use thiserror::Error;

/// Outward signal for an error kind, independent of any HTTP framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    BadRequest,
    NotFound,
    UnprocessableEntity,
    InternalServerError,
    ServiceUnavailable,
}

impl ErrorStatus {
    /// The HTTP status code this signal is rendered as.
    pub fn code(self) -> u16 {
        match self {
            ErrorStatus::BadRequest => 400,
            ErrorStatus::NotFound => 404,
            ErrorStatus::UnprocessableEntity => 422,
            ErrorStatus::InternalServerError => 500,
            ErrorStatus::ServiceUnavailable => 503,
        }
    }
}

/// Every way a forecast resolution can fail.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Address is required")]
    MissingAddress,

    #[error("Invalid ZIP code")]
    InvalidZipCode,

    /// The provider rejected our credentials. This is an operator fault.
    #[error("Invalid API key")]
    Unauthorized,

    #[error("API rate limit exceeded")]
    RateLimited,

    /// The provider could not resolve the query to a place.
    #[error("Location not found")]
    NotFound,

    #[error("Unable to connect to weather service: {0}")]
    Unreachable(String),

    #[error("Invalid response format from weather service: {0}")]
    MalformedPayload(String),

    #[error("Storage error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ForecastError {
    /// Outward status for this kind. A pure lookup, never derived from messages.
    pub fn status(&self) -> ErrorStatus {
        match self {
            ForecastError::MissingAddress => ErrorStatus::BadRequest,
            ForecastError::InvalidZipCode => ErrorStatus::UnprocessableEntity,
            ForecastError::Unauthorized => ErrorStatus::InternalServerError,
            ForecastError::RateLimited => ErrorStatus::ServiceUnavailable,
            ForecastError::NotFound => ErrorStatus::NotFound,
            ForecastError::Unreachable(_) => ErrorStatus::ServiceUnavailable,
            ForecastError::MalformedPayload(_) => ErrorStatus::InternalServerError,
            ForecastError::Persistence(_) => ErrorStatus::InternalServerError,
            ForecastError::Unexpected(_) => ErrorStatus::InternalServerError,
        }
    }

    /// Message safe to return to API clients.
    ///
    /// Storage and unexpected failures are collapsed into a generic message so
    /// that SQL text or upstream bodies never leave the process.
    pub fn user_message(&self) -> &'static str {
        match self {
            ForecastError::MissingAddress => "Address is required",
            ForecastError::InvalidZipCode => "Invalid ZIP code",
            ForecastError::Unauthorized => "Invalid API key",
            ForecastError::RateLimited => "API rate limit exceeded",
            ForecastError::NotFound => "Location not found",
            ForecastError::Unreachable(_) => "Unable to connect to weather service",
            ForecastError::MalformedPayload(_) => "Invalid response format from weather service",
            ForecastError::Persistence(_) | ForecastError::Unexpected(_) => {
                "An unexpected error occurred"
            }
        }
    }
}

/// Storage errors (SQLite location and forecast tables).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("Schema setup failed: {0}")]
    MigrationFailed(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_store_error(self) -> StoreError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_store_error(self) -> StoreError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                StoreError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::CannotOpen =>
            {
                StoreError::ConnectionFailed(self.to_string())
            }
            _ => StoreError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(ForecastError::MissingAddress.status(), ErrorStatus::BadRequest);
        assert_eq!(ForecastError::InvalidZipCode.status(), ErrorStatus::UnprocessableEntity);
        assert_eq!(ForecastError::Unauthorized.status(), ErrorStatus::InternalServerError);
        assert_eq!(ForecastError::RateLimited.status(), ErrorStatus::ServiceUnavailable);
        assert_eq!(ForecastError::NotFound.status(), ErrorStatus::NotFound);
        assert_eq!(
            ForecastError::Unreachable("timeout".into()).status(),
            ErrorStatus::ServiceUnavailable
        );
        assert_eq!(
            ForecastError::MalformedPayload("current.temp_f".into()).status(),
            ErrorStatus::InternalServerError
        );
        assert_eq!(
            ForecastError::Unexpected("HTTP 502".into()).status(),
            ErrorStatus::InternalServerError
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorStatus::BadRequest.code(), 400);
        assert_eq!(ErrorStatus::NotFound.code(), 404);
        assert_eq!(ErrorStatus::UnprocessableEntity.code(), 422);
        assert_eq!(ErrorStatus::InternalServerError.code(), 500);
        assert_eq!(ErrorStatus::ServiceUnavailable.code(), 503);
    }

    #[test]
    fn test_store_error_conversion() {
        let err: ForecastError = StoreError::QueryFailed("disk I/O error".into()).into();
        assert!(matches!(err, ForecastError::Persistence(StoreError::QueryFailed(_))));
        assert_eq!(err.status(), ErrorStatus::InternalServerError);
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        let err = ForecastError::Persistence(StoreError::QueryFailed("no such table".into()));
        assert!(err.to_string().contains("no such table"));
        assert_eq!(err.user_message(), "An unexpected error occurred");

        let err = ForecastError::Unexpected("HTTP 418".into());
        assert!(!err.user_message().contains("418"));
    }

    #[test]
    fn test_rusqlite_conversion() {
        let err = rusqlite::Error::QueryReturnedNoRows.into_store_error();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }
}
