//! Error types for web handlers.
//!
//! [`AppError`] is the single error type handlers return. Booking errors are
//! mapped by [`ErrorKind`], never by message text.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use slot_booking_core::{BookingError, ErrorKind};
use std::fmt;

/// Application error type for web handlers.
///
/// Carries the HTTP status, a stable error code for clients and a
/// user-facing message. The optional source is logged for server errors and
/// never sent to the client.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND",
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_SERVER_ERROR")
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::new(StatusCode::NOT_FOUND, err.to_string(), "NOT_FOUND"),
            ErrorKind::Conflict => Self::new(StatusCode::CONFLICT, err.to_string(), "CONFLICT"),
            ErrorKind::InvalidTransition => {
                Self::new(StatusCode::CONFLICT, err.to_string(), "INVALID_TRANSITION")
            }
            ErrorKind::StoreFailure => {
                let transient = matches!(&err, BookingError::Store(e) if e.is_transient());
                let base = if transient {
                    Self::unavailable("The booking store is temporarily unavailable")
                } else {
                    Self::internal("An internal error occurred")
                };
                base.with_source(anyhow::Error::new(err))
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slot_booking_core::{BookingId, BookingStatus, SlotId, StoreError};

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("slotId is required");
        assert_eq!(err.to_string(), "[BAD_REQUEST] slotId is required");
    }

    #[test]
    fn test_not_found() {
        let err = AppError::not_found("Booking", "abc");
        assert_eq!(err.to_string(), "[NOT_FOUND] Booking with id abc not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_booking_errors_map_by_kind() {
        let slot_id = SlotId::new();
        let booking_id = BookingId::new();

        let cases = [
            (BookingError::SlotNotFound(slot_id), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (BookingError::BookingNotFound(booking_id), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (BookingError::SlotAlreadyBooked(slot_id), StatusCode::CONFLICT, "CONFLICT"),
            (
                BookingError::InvalidTransition {
                    booking_id,
                    current: BookingStatus::Confirmed,
                    target: BookingStatus::Rejected,
                },
                StatusCode::CONFLICT,
                "INVALID_TRANSITION",
            ),
            (
                BookingError::Store(StoreError::Connection("pool timed out".into())),
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
            ),
            (
                BookingError::Store(StoreError::Decode("bad status".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            let app_err = AppError::from(err);
            assert_eq!(app_err.status(), status);
            assert_eq!(app_err.code(), code);
        }
    }

    #[test]
    fn test_store_failures_hide_details() {
        let err = AppError::from(BookingError::Store(StoreError::Query(
            "relation \"bookings\" does not exist".into(),
        )));

        assert!(!err.to_string().contains("relation"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
