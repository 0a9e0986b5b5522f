//! Redpanda notification transport for the slot booking service.
//!
//! This crate provides [`RedpandaTransport`], an implementation of the
//! `NotificationTransport` trait from `slot-booking-core` on top of rdkafka,
//! so any Kafka-compatible broker (Redpanda, Apache Kafka, MSK, ...) works.
//!
//! # Message Layout
//!
//! | Kafka field | Contents |
//! |---|---|
//! | topic | `OutboundMessage::destination` |
//! | key | `OutboundMessage::group_key` (provider id) |
//! | value | JSON event payload |
//! | headers | `EventType`, `BookingId`, `ProviderId`, `DeduplicationId` |
//!
//! Keying by provider puts all of one provider's events on one partition, so
//! consumers see them in publish order. The deduplication id header lets
//! consumers drop redeliveries; the producer itself gives at-least-once.
//!
//! # Example
//!
//! ```no_run
//! use slot_booking_redpanda::RedpandaTransport;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = RedpandaTransport::builder()
//!     .brokers("localhost:9092")
//!     .producer_acks("all")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use slot_booking_core::PublishError;
use slot_booking_core::notification::{MessageId, NotificationTransport, OutboundMessage};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Header carrying the deduplication id.
pub const DEDUPLICATION_HEADER: &str = "DeduplicationId";

/// Redpanda notification transport.
///
/// # Configuration
///
/// - **Broker addresses**: Bootstrap servers (required)
/// - **Producer settings**: Acks (default `all`), compression, timeout
pub struct RedpandaTransport {
    /// Kafka producer for publishing notifications
    producer: FutureProducer,
    /// Broker addresses
    brokers: String,
    /// Producer timeout
    timeout: Duration,
}

impl RedpandaTransport {
    /// Create a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Transport`] if the producer cannot be created.
    pub fn new(brokers: &str) -> Result<Self, PublishError> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a new builder for configuring the transport.
    #[must_use]
    pub fn builder() -> RedpandaTransportBuilder {
        RedpandaTransportBuilder::default()
    }

    /// Get a reference to the brokers string.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

/// Kafka headers for a message: its attributes plus the deduplication id.
fn headers_for(message: &OutboundMessage) -> OwnedHeaders {
    let headers = message
        .attributes
        .iter()
        .fold(OwnedHeaders::new(), |headers, (key, value)| {
            headers.insert(Header {
                key: key.as_str(),
                value: Some(value.as_str()),
            })
        });
    headers.insert(Header {
        key: DEDUPLICATION_HEADER,
        value: Some(message.deduplication_id.as_str()),
    })
}

/// Builder for configuring a [`RedpandaTransport`].
#[derive(Default)]
pub struct RedpandaTransportBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
}

impl RedpandaTransportBuilder {
    /// Set the broker addresses (comma-separated, e.g. `"localhost:9092"`).
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the producer acknowledgment mode: `"0"`, `"1"` or `"all"`.
    ///
    /// Default: `"all"`
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set the compression codec: `"none"`, `"gzip"`, `"snappy"`, `"lz4"`, `"zstd"`.
    ///
    /// Default: `"none"`
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set the producer send timeout.
    ///
    /// Default: 5 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the [`RedpandaTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Transport`] if brokers are not set or the
    /// producer cannot be created.
    pub fn build(self) -> Result<RedpandaTransport, PublishError> {
        let brokers = self
            .brokers
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| PublishError::Transport {
                destination: String::new(),
                reason: "Brokers not configured".to_string(),
            })?;
        let acks = self.producer_acks.as_deref().unwrap_or("all");
        let compression = self.compression.as_deref().unwrap_or("none");
        let timeout = self.timeout.unwrap_or(Duration::from_secs(5));

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", acks)
            .set("compression.type", compression)
            .create()
            .map_err(|e| PublishError::Transport {
                destination: String::new(),
                reason: format!("Failed to create producer: {e}"),
            })?;

        tracing::info!(
            brokers = %brokers,
            acks,
            compression,
            "RedpandaTransport created"
        );

        Ok(RedpandaTransport {
            producer,
            brokers,
            timeout,
        })
    }
}

impl NotificationTransport for RedpandaTransport {
    fn send(
        &self,
        message: OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<MessageId, PublishError>> + Send + '_>> {
        let timeout = self.timeout;

        Box::pin(async move {
            let record = FutureRecord::to(&message.destination)
                .payload(message.payload.as_slice())
                .key(message.group_key.as_str())
                .headers(headers_for(&message));

            match self.producer.send(record, Timeout::After(timeout)).await {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic = %message.destination,
                        partition,
                        offset,
                        deduplication_id = %message.deduplication_id,
                        "Notification delivered"
                    );
                    Ok(MessageId::new(format!(
                        "{}/{partition}/{offset}",
                        message.destination
                    )))
                }
                Err((kafka_error, _)) => Err(PublishError::Transport {
                    destination: message.destination.clone(),
                    reason: kafka_error.to_string(),
                }),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rdkafka::message::Headers;
    use slot_booking_core::{BookingStatus, DomainEvent, Utc};
    use slot_booking_testing::fixtures;

    #[test]
    fn redpanda_transport_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaTransport>();
        assert_sync::<RedpandaTransport>();
    }

    #[test]
    fn builder_without_brokers_fails() {
        let result = RedpandaTransport::builder().producer_acks("1").build();

        assert!(matches!(result, Err(PublishError::Transport { .. })));
    }

    #[test]
    fn headers_carry_attributes_and_deduplication_id() {
        let booking = fixtures::booking(BookingStatus::Pending);
        let event = DomainEvent::requested(&booking, Utc::now());
        let message = OutboundMessage::from_event("booking-events", &event).unwrap();

        let headers = headers_for(&message);
        let pairs: Vec<(String, String)> = headers
            .iter()
            .map(|h| {
                (
                    h.key.to_string(),
                    String::from_utf8(h.value.unwrap().to_vec()).unwrap(),
                )
            })
            .collect();

        assert_eq!(pairs.len(), 4);
        assert!(pairs.contains(&("EventType".to_string(), "BOOKING_CREATED".to_string())));
        assert!(pairs.contains(&("BookingId".to_string(), booking.id.to_string())));
        assert!(pairs.contains(&(DEDUPLICATION_HEADER.to_string(), event.deduplication_id())));
    }
}
