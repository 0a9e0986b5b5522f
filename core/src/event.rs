//! Domain events emitted after booking state changes.
//!
//! Events are immutable values describing something that already happened and
//! was committed. They carry enough data for a consumer to act without calling
//! back into the booking store.
//!
//! # Payload Contract
//!
//! Events are encoded as JSON objects with camelCase fields and an
//! `eventType` discriminator:
//!
//! ```text
//! BOOKING_CREATED   {bookingId, userId, providerId, slotId, slotStart, slotEnd, eventType, timestamp}
//! BOOKING_CONFIRMED {bookingId, providerId, acceptedAt, eventType, timestamp}
//! ```
//!
//! Rejections deliberately produce no event.

use crate::booking::Booking;
use crate::error::PublishError;
use crate::ids::{BookingId, ProviderId, SlotId, UserId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A booking was created in status `pending`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequested {
    /// The new booking
    pub booking_id: BookingId,
    /// Requester
    pub user_id: UserId,
    /// Provider who must accept or reject
    pub provider_id: ProviderId,
    /// Claimed slot
    pub slot_id: SlotId,
    /// Slot start
    pub slot_start: DateTime<Utc>,
    /// Slot end
    pub slot_end: DateTime<Utc>,
    /// When the event was produced
    pub timestamp: DateTime<Utc>,
}

/// A provider accepted a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmed {
    /// The confirmed booking
    pub booking_id: BookingId,
    /// Provider who accepted
    pub provider_id: ProviderId,
    /// When the booking was accepted
    pub accepted_at: DateTime<Utc>,
    /// When the event was produced
    pub timestamp: DateTime<Utc>,
}

/// The closed set of events the service publishes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum DomainEvent {
    /// See [`BookingRequested`]
    #[serde(rename = "BOOKING_CREATED")]
    BookingRequested(BookingRequested),
    /// See [`BookingConfirmed`]
    #[serde(rename = "BOOKING_CONFIRMED")]
    BookingConfirmed(BookingConfirmed),
}

impl DomainEvent {
    /// Build a `BOOKING_CREATED` event for a freshly reserved booking.
    #[must_use]
    pub fn requested(booking: &Booking, now: DateTime<Utc>) -> Self {
        Self::BookingRequested(BookingRequested {
            booking_id: booking.id,
            user_id: booking.user_id,
            provider_id: booking.provider_id,
            slot_id: booking.slot_id,
            slot_start: booking.start,
            slot_end: booking.end,
            timestamp: now,
        })
    }

    /// Build a `BOOKING_CONFIRMED` event for an accepted booking.
    #[must_use]
    pub fn confirmed(booking: &Booking, now: DateTime<Utc>) -> Self {
        Self::BookingConfirmed(BookingConfirmed {
            booking_id: booking.id,
            provider_id: booking.provider_id,
            accepted_at: now,
            timestamp: now,
        })
    }

    /// The `eventType` discriminator.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::BookingRequested(_) => "BOOKING_CREATED",
            Self::BookingConfirmed(_) => "BOOKING_CONFIRMED",
        }
    }

    /// Booking the event is about.
    #[must_use]
    pub const fn booking_id(&self) -> BookingId {
        match self {
            Self::BookingRequested(e) => e.booking_id,
            Self::BookingConfirmed(e) => e.booking_id,
        }
    }

    /// Provider the event concerns; used as the message grouping key.
    #[must_use]
    pub const fn provider_id(&self) -> ProviderId {
        match self {
            Self::BookingRequested(e) => e.provider_id,
            Self::BookingConfirmed(e) => e.provider_id,
        }
    }

    /// When the event was produced.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::BookingRequested(e) => e.timestamp,
            Self::BookingConfirmed(e) => e.timestamp,
        }
    }

    /// Deduplication id: `{eventType}-{bookingId}-{timestamp}`.
    #[must_use]
    pub fn deduplication_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.event_type(),
            self.booking_id(),
            self.timestamp().to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    /// Encode the event as its JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Serialization`] if encoding fails.
    pub fn to_payload(&self) -> Result<Vec<u8>, PublishError> {
        serde_json::to_vec(self).map_err(|e| PublishError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::booking::BookingStatus;
    use chrono::TimeZone;

    fn booking() -> Booking {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        Booking {
            id: BookingId::new(),
            user_id: UserId::new(),
            provider_id: ProviderId::new(),
            slot_id: SlotId::new(),
            start,
            end: start + chrono::Duration::minutes(45),
            status: BookingStatus::Pending,
        }
    }

    fn keys(value: &serde_json::Value) -> Vec<String> {
        let mut keys: Vec<String> = value
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn booking_requested_payload_has_exact_fields() {
        let booking = booking();
        let now = Utc.with_ymd_and_hms(2025, 2, 20, 12, 0, 0).unwrap();
        let event = DomainEvent::requested(&booking, now);

        let json: serde_json::Value = serde_json::from_slice(&event.to_payload().unwrap()).unwrap();

        assert_eq!(
            keys(&json),
            vec![
                "bookingId", "eventType", "providerId", "slotEnd", "slotId", "slotStart",
                "timestamp", "userId",
            ]
        );
        assert_eq!(json["eventType"], "BOOKING_CREATED");
        assert_eq!(json["bookingId"], booking.id.to_string());
        assert_eq!(json["slotStart"], "2025-03-01T09:00:00Z");
    }

    #[test]
    fn booking_confirmed_payload_has_exact_fields() {
        let booking = booking();
        let now = Utc.with_ymd_and_hms(2025, 2, 21, 8, 30, 0).unwrap();
        let event = DomainEvent::confirmed(&booking, now);

        let json: serde_json::Value = serde_json::from_slice(&event.to_payload().unwrap()).unwrap();

        assert_eq!(
            keys(&json),
            vec!["acceptedAt", "bookingId", "eventType", "providerId", "timestamp"]
        );
        assert_eq!(json["eventType"], "BOOKING_CONFIRMED");
        assert_eq!(json["acceptedAt"], json["timestamp"]);
    }

    #[test]
    fn deduplication_id_combines_type_booking_and_time() {
        let booking = booking();
        let now = Utc.with_ymd_and_hms(2025, 2, 21, 8, 30, 0).unwrap();
        let event = DomainEvent::confirmed(&booking, now);

        assert_eq!(
            event.deduplication_id(),
            format!("BOOKING_CONFIRMED-{}-2025-02-21T08:30:00.000Z", booking.id)
        );
    }
}
