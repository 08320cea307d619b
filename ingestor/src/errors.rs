use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

pub const MALFORMED_MESSAGE: &str = "Invalid JSON format.";
pub const INVALID_MESSAGE: &str =
    "Invalid JSON format. Expected fields: DeviceID, Status, Timestamp.";
pub const STORAGE_MESSAGE: &str = "Failed to store data in the database.";
pub const LOOKUP_MESSAGE: &str = "Failed to read data from the database.";
pub const DATE_MESSAGE: &str = "Date parameter is required (YYYY-MM-DD).";

/// Failures raised by a `TelemetryStore`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("connecting to the database timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed request body: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    #[error("Unreadable request body: {0}")]
    UnreadableBody(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad date parameter: {0}")]
    DateParameter(String),

    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),

    #[error("Lookup error: {0}")]
    Lookup(#[source] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MalformedRequest(_)
            | Error::UnreadableBody(_)
            | Error::Validation(_)
            | Error::DateParameter(_) => StatusCode::BAD_REQUEST,
            Error::Storage(_) | Error::Lookup(_) | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text returned to the caller. Never carries store or driver detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::MalformedRequest(_) | Error::UnreadableBody(_) => MALFORMED_MESSAGE,
            Error::Validation(_) => INVALID_MESSAGE,
            Error::DateParameter(_) => DATE_MESSAGE,
            Error::Storage(_) => STORAGE_MESSAGE,
            Error::Lookup(_) => LOOKUP_MESSAGE,
            Error::Config(_) => "Internal server error.",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::MalformedRequest(e) => warn!("Invalid JSON received: {}", e),
            Error::UnreadableBody(e) => warn!("Failed to read request body: {}", e),
            Error::Validation(reason) => warn!("Rejected telemetry: {}", reason),
            Error::DateParameter(reason) => warn!("Rejected daily summary query: {}", reason),
            Error::Storage(e) => error!("Failed to store data in the database: {}", e),
            Error::Lookup(e) => error!("Failed to read data from the database: {}", e),
            Error::Config(_) => error!("API error: {}", self),
        }

        (self.status(), self.public_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let malformed = Error::MalformedRequest(serde_json::from_str::<u8>("x").unwrap_err());
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(malformed.public_message(), MALFORMED_MESSAGE);

        let invalid = Error::Validation("DeviceID missing".to_string());
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.public_message(), INVALID_MESSAGE);
    }

    #[test]
    fn test_storage_message_hides_detail() {
        let err = Error::Storage(StorageError::Database(sqlx::Error::Protocol(
            "password authentication failed for user iot".to_string(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("password"));
        assert!(err.to_string().contains("password"));
    }
}
