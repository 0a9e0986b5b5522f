//! Application state for Axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use slot_booking_runtime::BookingEngine;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; the engine and the metrics handle are both cheap
/// `Arc`-backed handles.
#[derive(Clone)]
pub struct AppState {
    /// Booking operations
    pub engine: BookingEngine,
    /// Prometheus handle backing `GET /metrics`, if a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state around a booking engine, without metrics.
    #[must_use]
    pub const fn new(engine: BookingEngine) -> Self {
        Self {
            engine,
            metrics: None,
        }
    }

    /// Serve metrics from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone_send_sync() {
        fn assert_bounds<T: Clone + Send + Sync + 'static>() {}
        assert_bounds::<AppState>();
    }
}
