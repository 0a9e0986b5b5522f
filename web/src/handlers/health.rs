//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

/// Health report body.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthReport {
    /// `ok` or `unavailable`
    pub status: &'static str,
    /// Failure detail when the store is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness check.
///
/// Returns 200 OK while the process is serving requests. Does NOT check the
/// database.
///
/// # Endpoint
///
/// ```text
/// GET /health/live
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness check: pings the booking store.
///
/// # Status Codes
///
/// - 200 OK: the store answered
/// - 503 Service Unavailable: the store could not be reached
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// { "status": "ok" }
/// ```
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    match state.engine.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthReport {
                status: "ok",
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed: store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport {
                    status: "unavailable",
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
