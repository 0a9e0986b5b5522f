//! Prometheus metrics for observability and monitoring.
//!
//! Metrics collected by the booking service:
//! - Reservations by outcome, plus reserve latency
//! - Accept/reject transitions by target status and outcome
//! - Notification publish attempts by outcome
//!
//! The HTTP layer renders the recorder at `GET /metrics`; there is no
//! separate metrics listener.
//!
//! # Example
//!
//! ```rust,no_run
//! use slot_booking_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new();
//! server.start()?;
//!
//! let body = server.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use slot_booking_core::{BookingError, BookingStatus};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder owner.
///
/// Installs the global recorder once and hands out the handle used to render
/// the scrape body.
#[derive(Default)]
pub struct MetricsServer {
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a metrics server that has not installed a recorder yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), this logs a
    /// warning and leaves [`handle`](Self::handle) empty.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "booking_reservations_total",
        "Reserve calls, labelled by outcome"
    );
    describe_histogram!(
        "booking_reserve_duration_seconds",
        "Time taken by the reserve transaction"
    );
    describe_counter!(
        "booking_transitions_total",
        "Accept/reject calls, labelled by target status and outcome"
    );
    describe_counter!(
        "booking_notifications_total",
        "Notification publish attempts, labelled by outcome"
    );
}

/// Outcome label for an engine result.
fn outcome<T>(result: &Result<T, BookingError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.kind().as_str(),
    }
}

/// Reservation metrics recorder.
pub struct ReservationMetrics;

impl ReservationMetrics {
    /// Record a reserve call.
    pub fn record<T>(result: &Result<T, BookingError>, duration: Duration) {
        counter!("booking_reservations_total", "outcome" => outcome(result)).increment(1);
        histogram!("booking_reserve_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Status transition metrics recorder.
pub struct TransitionMetrics;

impl TransitionMetrics {
    /// Record an accept or reject call.
    pub fn record<T>(target: BookingStatus, result: &Result<T, BookingError>) {
        counter!(
            "booking_transitions_total",
            "target" => target.as_str(),
            "outcome" => outcome(result)
        )
        .increment(1);
    }
}

/// Notification metrics recorder.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record a delivered message.
    pub fn record_published() {
        counter!("booking_notifications_total", "outcome" => "published").increment(1);
    }

    /// Record a publish skipped because no destination is configured.
    pub fn record_skipped() {
        counter!("booking_notifications_total", "outcome" => "skipped").increment(1);
    }

    /// Record a failed publish.
    pub fn record_failed() {
        counter!("booking_notifications_total", "outcome" => "failed").increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slot_booking_core::{BookingId, StoreError};

    #[test]
    fn test_metrics_server_creation() {
        let server = MetricsServer::new();
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[test]
    fn test_metrics_server_start() {
        let mut server = MetricsServer::new();
        assert!(server.start().is_ok());
        // handle might be None if another test already installed the recorder
    }

    #[test]
    fn outcome_labels_follow_error_kind() {
        let ok: Result<(), BookingError> = Ok(());
        let missing: Result<(), BookingError> = Err(BookingError::BookingNotFound(BookingId::new()));
        let store: Result<(), BookingError> =
            Err(StoreError::Connection("refused".to_string()).into());

        assert_eq!(outcome(&ok), "success");
        assert_eq!(outcome(&missing), "not_found");
        assert_eq!(outcome(&store), "store_failure");
    }
}
