//! Notification transports that record or fail, for publish tests.
//!
//! Publishing happens on a spawned task after the engine call returns, so
//! tests use [`RecordingTransport::wait_for_messages`] instead of asserting
//! immediately.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use slot_booking_core::notification::{MessageId, NotificationTransport, OutboundMessage};
use slot_booking_core::{DomainEvent, PublishError};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

async fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if done() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Transport that keeps every message it is given.
///
/// Clones share the same buffer, so a test can keep one handle and pass
/// another to the publisher.
#[derive(Clone, Debug, Default)]
pub struct RecordingTransport {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl RecordingTransport {
    /// Create an empty recording transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, in send order.
    #[must_use]
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Payloads of the received messages, decoded back into events.
    #[must_use]
    pub fn events(&self) -> Vec<DomainEvent> {
        self.messages()
            .iter()
            .map(|m| serde_json::from_slice(&m.payload).unwrap())
            .collect()
    }

    /// Number of messages received so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Whether nothing has been received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` messages arrived.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_for_messages(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.len() >= count).await
    }
}

impl NotificationTransport for RecordingTransport {
    fn send(
        &self,
        message: OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<MessageId, PublishError>> + Send + '_>> {
        Box::pin(async move {
            let mut messages = self.messages.lock().unwrap();
            let id = MessageId::new(format!("{}/{}", message.destination, messages.len()));
            messages.push(message);
            Ok(id)
        })
    }
}

/// Transport that rejects every message.
#[derive(Clone, Debug)]
pub struct FailingTransport {
    reason: String,
    attempts: Arc<AtomicUsize>,
}

impl FailingTransport {
    /// Create a transport failing with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of send attempts so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` sends were attempted.
    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.attempts() >= count).await
    }
}

impl Default for FailingTransport {
    fn default() -> Self {
        Self::new("broker unavailable")
    }
}

impl NotificationTransport for FailingTransport {
    fn send(
        &self,
        message: OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<MessageId, PublishError>> + Send + '_>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(PublishError::Transport {
                destination: message.destination,
                reason: self.reason.clone(),
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use slot_booking_core::{BookingStatus, Utc};

    fn message() -> OutboundMessage {
        let booking = fixtures::booking(BookingStatus::Pending);
        OutboundMessage::from_event("booking-events", &DomainEvent::requested(&booking, Utc::now()))
            .unwrap()
    }

    #[tokio::test]
    async fn recording_transport_keeps_messages_in_order() {
        let transport = RecordingTransport::new();
        let first = message();
        let second = message();

        let id = transport.send(first.clone()).await.unwrap();
        transport.send(second.clone()).await.unwrap();

        assert_eq!(id.as_str(), "booking-events/0");
        assert_eq!(transport.messages(), vec![first, second]);
        assert_eq!(transport.events()[0].event_type(), "BOOKING_CREATED");
    }

    #[tokio::test]
    async fn wait_for_messages_times_out_when_nothing_arrives() {
        let transport = RecordingTransport::new();

        assert!(!transport.wait_for_messages(1, Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn failing_transport_counts_attempts() {
        let transport = FailingTransport::new("boom");

        let err = transport.send(message()).await.unwrap_err();

        assert_eq!(transport.attempts(), 1);
        assert!(err.to_string().contains("boom"));
    }
}
