//! Fire-and-forget publishing of domain events.
//!
//! [`NotificationPublisher::publish`] encodes an event and hands it to the
//! configured transport. [`NotificationPublisher::dispatch`] runs the same thing
//! on a spawned task so the caller never waits on, or learns about, the
//! outcome; failures end up in the log and in `booking_notifications_total`.
//!
//! In-flight dispatches are counted so the server can drain them on shutdown
//! ([`NotificationPublisher::shutdown`]).

use crate::metrics::NotificationMetrics;
use slot_booking_core::notification::{MessageId, NotificationTransport, OutboundMessage};
use slot_booking_core::{DomainEvent, PublishError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Returned by [`NotificationPublisher::shutdown`] when publishes are still
/// running at the deadline.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Shutdown timed out with {0} notifications still in flight")]
pub struct ShutdownTimeout(pub usize);

/// Decrements the in-flight counter when a dispatched task ends.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Publishes domain events to a single destination.
///
/// Cloning is cheap; clones share the transport and the in-flight counter.
#[derive(Clone)]
pub struct NotificationPublisher {
    transport: Option<Arc<dyn NotificationTransport>>,
    destination: String,
    in_flight: Arc<AtomicUsize>,
}

impl NotificationPublisher {
    /// Create a publisher sending to `destination` through `transport`.
    ///
    /// An empty `destination` leaves publishing disabled.
    #[must_use]
    pub fn new(transport: Arc<dyn NotificationTransport>, destination: impl Into<String>) -> Self {
        Self {
            transport: Some(transport),
            destination: destination.into(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a publisher with no transport; every publish is a logged no-op.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            transport: None,
            destination: String::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Whether a transport and a non-empty destination are configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some() && !self.destination.trim().is_empty()
    }

    /// Destination topic or queue.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Number of dispatched publishes that have not finished yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Publish `event` and wait for the transport's answer.
    ///
    /// Returns `Ok(None)` without contacting anything when publishing is
    /// disabled.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the event cannot be encoded or the transport
    /// fails.
    pub async fn publish(&self, event: &DomainEvent) -> Result<Option<MessageId>, PublishError> {
        let Some(transport) = self.transport.as_ref().filter(|_| self.is_enabled()) else {
            tracing::warn!(
                event_type = event.event_type(),
                booking_id = %event.booking_id(),
                "Notification destination not configured, skipping publish"
            );
            NotificationMetrics::record_skipped();
            return Ok(None);
        };

        let message = OutboundMessage::from_event(self.destination.clone(), event)?;
        let message_id = transport.send(message).await?;
        Ok(Some(message_id))
    }

    /// Publish `event` on a spawned task; the outcome is only logged.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, event: DomainEvent) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let publisher = self.clone();

        tokio::spawn(async move {
            let _guard = guard;
            match publisher.publish(&event).await {
                Ok(Some(message_id)) => {
                    NotificationMetrics::record_published();
                    tracing::info!(
                        event_type = event.event_type(),
                        booking_id = %event.booking_id(),
                        message_id = %message_id,
                        "Notification published"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    NotificationMetrics::record_failed();
                    tracing::error!(
                        event_type = event.event_type(),
                        booking_id = %event.booking_id(),
                        error = %e,
                        "Failed to publish notification"
                    );
                }
            }
        });
    }

    /// Wait for dispatched publishes to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownTimeout`] with the number still running if `timeout`
    /// expires first.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ShutdownTimeout> {
        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(20);

        loop {
            let pending = self.in_flight();
            if pending == 0 {
                tracing::info!("All notifications flushed");
                return Ok(());
            }
            if start.elapsed() >= timeout {
                tracing::error!(pending, "Notification flush timed out");
                return Err(ShutdownTimeout(pending));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

impl std::fmt::Debug for NotificationPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationPublisher")
            .field("destination", &self.destination)
            .field("enabled", &self.is_enabled())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use slot_booking_core::{BookingStatus, Utc};
    use slot_booking_testing::{FailingTransport, RecordingTransport, fixtures};

    fn event() -> DomainEvent {
        DomainEvent::requested(&fixtures::booking(BookingStatus::Pending), Utc::now())
    }

    #[tokio::test]
    async fn disabled_publisher_is_a_no_op() {
        let publisher = NotificationPublisher::disabled();

        assert!(!publisher.is_enabled());
        assert_eq!(publisher.publish(&event()).await, Ok(None));
    }

    #[tokio::test]
    async fn empty_destination_skips_the_transport() {
        let transport = RecordingTransport::new();
        let publisher = NotificationPublisher::new(Arc::new(transport.clone()), "  ");

        assert_eq!(publisher.publish(&event()).await, Ok(None));
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn publish_returns_transport_message_id() {
        let transport = RecordingTransport::new();
        let publisher = NotificationPublisher::new(Arc::new(transport.clone()), "booking-events");
        let event = event();

        let id = publisher.publish(&event).await.unwrap().unwrap();

        assert_eq!(id.as_str(), "booking-events/0");
        assert_eq!(transport.events(), vec![event]);
    }

    #[tokio::test]
    async fn publish_surfaces_transport_errors() {
        let publisher =
            NotificationPublisher::new(Arc::new(FailingTransport::new("down")), "booking-events");

        let err = publisher.publish(&event()).await.unwrap_err();

        assert!(matches!(err, PublishError::Transport { ref destination, .. } if destination == "booking-events"));
    }

    #[tokio::test]
    async fn shutdown_waits_for_dispatched_publishes() {
        let transport = RecordingTransport::new();
        let publisher = NotificationPublisher::new(Arc::new(transport.clone()), "booking-events");

        publisher.dispatch(event());
        publisher.dispatch(event());
        publisher.shutdown(Duration::from_secs(1)).await.unwrap();

        assert_eq!(publisher.in_flight(), 0);
        assert_eq!(transport.len(), 2);
    }
}
