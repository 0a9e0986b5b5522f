//! Slots, bookings and the booking status state machine.
//!
//! # State Machine
//!
//! ```text
//!            accept
//!   Pending ────────▶ Confirmed
//!      │
//!      │ reject
//!      ▼
//!   Rejected
//!
//!   Cancelled  (representable, not produced by reserve/accept/reject)
//! ```
//!
//! `Pending` is the only non-terminal status. A booking that has left it can
//! never be transitioned again by this service.

use crate::ids::{BookingId, ProviderId, SlotId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A provider's offered time window.
///
/// `is_booked` flips from `false` to `true` exactly once, inside the reserve
/// transaction, and never flips back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Slot identifier
    pub id: SlotId,
    /// Provider offering the slot
    pub provider_id: ProviderId,
    /// Start of the window
    pub start: DateTime<Utc>,
    /// End of the window (strictly after `start`)
    pub end: DateTime<Utc>,
    /// Whether a booking already claims this slot
    pub is_booked: bool,
}

/// Lifecycle status of a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Requested, awaiting the provider's decision
    Pending,
    /// Accepted by the provider
    Confirmed,
    /// Rejected by the provider
    Rejected,
    /// Cancelled (not produced by in-scope operations)
    Cancelled,
}

/// Error returned when a status string is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid booking status: {0}")]
pub struct ParseStatusError(pub String);

impl BookingStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is possible from this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether `self → target` is an allowed transition.
    ///
    /// ```
    /// use slot_booking_core::BookingStatus;
    ///
    /// assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
    /// assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Rejected));
    /// ```
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Confirmed | Self::Rejected)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// A requester's claim on a slot.
///
/// `start`/`end` are copied from the slot when the booking is created and are
/// never updated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking identifier
    pub id: BookingId,
    /// Requester
    pub user_id: UserId,
    /// Provider that owns the slot and may accept or reject
    pub provider_id: ProviderId,
    /// The claimed slot (one booking per slot)
    pub slot_id: SlotId,
    /// Slot start, copied at creation
    pub start: DateTime<Utc>,
    /// Slot end, copied at creation
    pub end: DateTime<Utc>,
    /// Current status
    pub status: BookingStatus,
}

/// Values for the booking row inserted by the reserve transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBooking {
    /// Requester
    pub user_id: UserId,
    /// Provider copied from the locked slot
    pub provider_id: ProviderId,
    /// The slot being claimed
    pub slot_id: SlotId,
    /// Slot start
    pub start: DateTime<Utc>,
    /// Slot end
    pub end: DateTime<Utc>,
}

impl NewBooking {
    /// Build the booking values for `user_id` claiming `slot`.
    #[must_use]
    pub fn for_slot(slot: &Slot, user_id: UserId) -> Self {
        Self {
            user_id,
            provider_id: slot.provider_id,
            slot_id: slot.id,
            start: slot.start,
            end: slot.end,
        }
    }
}

/// A conditional status write: applies only while the booking belongs to
/// `provider_id` and is still in status `from`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusChange {
    /// Booking to update
    pub booking_id: BookingId,
    /// Owning provider (part of the predicate)
    pub provider_id: ProviderId,
    /// Expected current status (part of the predicate)
    pub from: BookingStatus,
    /// New status
    pub to: BookingStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = BookingStatus> {
        prop_oneof![
            Just(BookingStatus::Pending),
            Just(BookingStatus::Confirmed),
            Just(BookingStatus::Rejected),
            Just(BookingStatus::Cancelled),
        ]
    }

    proptest! {
        #[test]
        fn only_pending_has_outgoing_transitions(from in any_status(), to in any_status()) {
            if from.can_transition_to(to) {
                prop_assert_eq!(from, BookingStatus::Pending);
                prop_assert!(to.is_terminal());
            }
        }

        #[test]
        fn status_string_form_is_stable(status in any_status()) {
            prop_assert_eq!(status.as_str().parse::<BookingStatus>(), Ok(status));
            prop_assert_eq!(status.to_string(), status.as_str());
        }
    }

    #[test]
    fn pending_cannot_move_to_cancelled_or_itself() {
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Pending));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Cancelled));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(
            "accepted".parse::<BookingStatus>(),
            Err(ParseStatusError("accepted".to_string()))
        );
    }

    #[test]
    fn new_booking_copies_slot_window() {
        let start = Utc::now();
        let slot = Slot {
            id: SlotId::new(),
            provider_id: ProviderId::new(),
            start,
            end: start + chrono::Duration::minutes(30),
            is_booked: false,
        };
        let user_id = UserId::new();

        let new_booking = NewBooking::for_slot(&slot, user_id);

        assert_eq!(new_booking.slot_id, slot.id);
        assert_eq!(new_booking.provider_id, slot.provider_id);
        assert_eq!(new_booking.start, slot.start);
        assert_eq!(new_booking.end, slot.end);
        assert_eq!(new_booking.user_id, user_id);
    }

    #[test]
    fn booking_serializes_with_camel_case_fields() {
        let start = Utc::now();
        let booking = Booking {
            id: BookingId::new(),
            user_id: UserId::new(),
            provider_id: ProviderId::new(),
            slot_id: SlotId::new(),
            start,
            end: start + chrono::Duration::hours(1),
            status: BookingStatus::Pending,
        };

        let json = serde_json::to_value(&booking).unwrap();

        assert_eq!(json["status"], "pending");
        assert_eq!(json["slotId"], booking.slot_id.to_string());
        assert_eq!(json["providerId"], booking.provider_id.to_string());
        assert!(json.get("slot_id").is_none());
    }
}
