//! Integration tests for [`RedpandaTransport`] with a real Kafka broker.
//!
//! These tests publish booking notifications through the transport and read
//! them back with a plain rdkafka consumer, checking the key, headers and
//! payload a downstream consumer relies on.
//!
//! # Running These Tests
//!
//! Ignored by default since they need Docker and take a while to start Kafka:
//! ```bash
//! cargo test -p slot-booking-redpanda --test integration_tests -- --ignored
//! ```

#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use rdkafka::Message;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Headers;
use slot_booking_core::notification::{NotificationTransport, OutboundMessage};
use slot_booking_core::{Booking, BookingStatus, DomainEvent, Utc};
use slot_booking_redpanda::{DEDUPLICATION_HEADER, RedpandaTransport};
use slot_booking_testing::fixtures;
use std::collections::HashMap;
use std::time::Duration;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::kafka::{KAFKA_PORT, Kafka};

const TOPIC: &str = "booking-events";

/// Publish to a scratch topic until the broker accepts writes.
async fn wait_for_kafka_ready(transport: &RedpandaTransport) {
    let booking = fixtures::booking(BookingStatus::Pending);
    let warmup = OutboundMessage::from_event("warmup-topic", &DomainEvent::requested(&booking, Utc::now()))
        .expect("Failed to build warmup message");

    for attempt in 1..=60 {
        if transport.send(warmup.clone()).await.is_ok() {
            tokio::time::sleep(Duration::from_millis(500)).await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(attempt != 60, "Kafka failed to become ready after {attempt} attempts");
    }
}

fn header_map(message: &impl Message) -> HashMap<String, String> {
    message
        .headers()
        .map(|headers| {
            headers
                .iter()
                .filter_map(|h| {
                    h.value
                        .map(|v| (h.key.to_string(), String::from_utf8_lossy(v).into_owned()))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_notifications_keyed_by_provider_with_headers() {
    slot_booking_testing::init_tracing();

    let kafka = Kafka::default()
        .with_env_var("KAFKA_AUTO_CREATE_TOPICS_ENABLE", "true")
        .start()
        .await
        .expect("Failed to start Kafka container");

    let host = kafka.get_host().await.expect("Failed to get host");
    let port = kafka
        .get_host_port_ipv4(KAFKA_PORT)
        .await
        .expect("Failed to get port");
    let brokers = format!("{host}:{port}");

    let transport = RedpandaTransport::builder()
        .brokers(&brokers)
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create transport");
    wait_for_kafka_ready(&transport).await;

    let pending = fixtures::booking(BookingStatus::Pending);
    let confirmed = Booking {
        status: BookingStatus::Confirmed,
        ..pending.clone()
    };
    let requested_event = DomainEvent::requested(&pending, Utc::now());
    let confirmed_event = DomainEvent::confirmed(&confirmed, Utc::now());

    for event in [&requested_event, &confirmed_event] {
        let message = OutboundMessage::from_event(TOPIC, event).expect("Failed to build message");
        let id = transport.send(message).await.expect("Failed to publish");
        assert!(id.as_str().starts_with(TOPIC));
    }

    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", "booking-events-test")
        .set("auto.offset.reset", "earliest")
        .set("enable.auto.commit", "false")
        .create()
        .expect("Failed to create consumer");
    consumer.subscribe(&[TOPIC]).expect("Failed to subscribe");

    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(30), async {
        while received.len() < 2 {
            let message = consumer.recv().await.expect("Failed to receive");
            let key = message.key().map(|k| String::from_utf8_lossy(k).into_owned());
            let headers = header_map(&message);
            let event: DomainEvent =
                serde_json::from_slice(message.payload().expect("Message has no payload"))
                    .expect("Payload is not a DomainEvent");
            received.push((key, headers, event));
        }
    })
    .await
    .expect("Timeout waiting for notifications");

    let provider_key = pending.provider_id.to_string();
    for (key, headers, _) in &received {
        assert_eq!(key.as_deref(), Some(provider_key.as_str()));
        assert_eq!(headers.get("BookingId"), Some(&pending.id.to_string()));
        assert_eq!(headers.get("ProviderId"), Some(&provider_key));
    }

    // One provider, one partition: publish order is preserved.
    assert_eq!(received[0].2, requested_event);
    assert_eq!(received[1].2, confirmed_event);
    assert_eq!(
        received[0].1.get("EventType").map(String::as_str),
        Some("BOOKING_CREATED")
    );
    assert_eq!(
        received[0].1.get(DEDUPLICATION_HEADER),
        Some(&requested_event.deduplication_id())
    );
    assert_ne!(
        received[0].1.get(DEDUPLICATION_HEADER),
        received[1].1.get(DEDUPLICATION_HEADER)
    );
}

#[tokio::test]
#[ignore = "waits for the producer timeout"]
async fn test_unreachable_broker_reports_transport_error() {
    let transport = RedpandaTransport::builder()
        .brokers("127.0.0.1:1")
        .timeout(Duration::from_secs(2))
        .build()
        .expect("Failed to create transport");
    let booking = fixtures::booking(BookingStatus::Pending);
    let message = OutboundMessage::from_event(TOPIC, &DomainEvent::requested(&booking, Utc::now()))
        .expect("Failed to build message");

    let err = transport.send(message).await.unwrap_err();

    assert!(matches!(
        err,
        slot_booking_core::PublishError::Transport { ref destination, .. } if destination == TOPIC
    ));
}
