//! Outbound notification transport abstraction.
//!
//! A transport delivers one already-encoded message to a destination (a topic
//! or queue) and returns the broker-assigned message id. It knows nothing
//! about bookings; `NotificationPublisher` in `slot-booking-runtime` turns
//! [`DomainEvent`]s into [`OutboundMessage`]s.
//!
//! # Ordering and Deduplication
//!
//! Every message carries a `group_key` (the provider id) and a
//! `deduplication_id`. Transports that support message grouping use the key
//! to keep one provider's events in order (Kafka: message key, hence
//! partition). Nothing here guarantees exactly-once delivery end to end.
//!
//! # Implementations
//!
//! - `RedpandaTransport` (in `slot-booking-redpanda`): Kafka-compatible brokers
//! - `RecordingTransport` / `FailingTransport` (in `slot-booking-testing`)

use crate::error::PublishError;
use crate::event::DomainEvent;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Attribute carrying the event type.
pub const ATTR_EVENT_TYPE: &str = "EventType";
/// Attribute carrying the booking id.
pub const ATTR_BOOKING_ID: &str = "BookingId";
/// Attribute carrying the provider id.
pub const ATTR_PROVIDER_ID: &str = "ProviderId";

/// Broker-assigned identifier of a delivered message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Create a message id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the message id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message ready to be handed to a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Topic or queue name
    pub destination: String,
    /// Encoded event body
    pub payload: Vec<u8>,
    /// String attributes (headers)
    pub attributes: BTreeMap<String, String>,
    /// Ordering key; events sharing it should be delivered in order
    pub group_key: String,
    /// Stable id a broker may use to drop duplicates
    pub deduplication_id: String,
}

impl OutboundMessage {
    /// Encode `event` for `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Serialization`] if the event cannot be encoded.
    pub fn from_event(destination: impl Into<String>, event: &DomainEvent) -> Result<Self, PublishError> {
        let mut attributes = BTreeMap::new();
        attributes.insert(ATTR_EVENT_TYPE.to_string(), event.event_type().to_string());
        attributes.insert(ATTR_BOOKING_ID.to_string(), event.booking_id().to_string());
        attributes.insert(ATTR_PROVIDER_ID.to_string(), event.provider_id().to_string());

        Ok(Self {
            destination: destination.into(),
            payload: event.to_payload()?,
            attributes,
            group_key: event.provider_id().to_string(),
            deduplication_id: event.deduplication_id(),
        })
    }
}

/// Transport for outbound notifications.
///
/// # Dyn Compatibility
///
/// Returns `Pin<Box<dyn Future>>` so the transport can be held as
/// `Arc<dyn NotificationTransport>` and moved into spawned publish tasks.
pub trait NotificationTransport: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Transport`] if delivery fails.
    fn send(
        &self,
        message: OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<MessageId, PublishError>> + Send + '_>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::booking::{Booking, BookingStatus};
    use crate::ids::{BookingId, ProviderId, SlotId, UserId};
    use chrono::Utc;

    #[test]
    fn message_from_event_carries_grouping_and_attributes() {
        let now = Utc::now();
        let booking = Booking {
            id: BookingId::new(),
            user_id: UserId::new(),
            provider_id: ProviderId::new(),
            slot_id: SlotId::new(),
            start: now,
            end: now + chrono::Duration::minutes(30),
            status: BookingStatus::Pending,
        };
        let event = DomainEvent::requested(&booking, now);

        let message = OutboundMessage::from_event("booking-events", &event).unwrap();

        assert_eq!(message.destination, "booking-events");
        assert_eq!(message.group_key, booking.provider_id.to_string());
        assert_eq!(message.attributes[ATTR_EVENT_TYPE], "BOOKING_CREATED");
        assert_eq!(message.attributes[ATTR_BOOKING_ID], booking.id.to_string());
        assert_eq!(message.attributes[ATTR_PROVIDER_ID], booking.provider_id.to_string());
        assert_eq!(message.deduplication_id, event.deduplication_id());
    }
}
