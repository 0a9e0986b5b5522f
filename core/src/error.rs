//! Error types for booking operations.
//!
//! Three layers of failure are kept apart:
//!
//! - [`BookingError`]: what `reserve` / `accept` / `reject` return. Business
//!   outcomes (not found, conflict, invalid transition) are ordinary variants,
//!   and [`BookingError::kind`] gives callers an exhaustive [`ErrorKind`] to map
//!   onto responses without inspecting messages.
//! - [`StoreError`]: failures of the persistent store.
//! - [`PublishError`]: failures of the notification transport. These never
//!   become a `BookingError`; the dispatcher logs and drops them.

use crate::booking::BookingStatus;
use crate::ids::{BookingId, SlotId};
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Coarse classification of a [`BookingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Slot or booking absent, or booking owned by another provider
    NotFound,
    /// Slot already booked
    Conflict,
    /// Booking is not `pending`
    InvalidTransition,
    /// Store connection, lock or query failure
    StoreFailure,
}

impl ErrorKind {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidTransition => "invalid_transition",
            Self::StoreFailure => "store_failure",
        }
    }
}

/// Errors returned by booking operations.
#[derive(Error, Debug)]
pub enum BookingError {
    /// The slot does not exist.
    #[error("Slot not found: {0}")]
    SlotNotFound(SlotId),

    /// The booking does not exist, or belongs to a different provider.
    ///
    /// Both cases deliberately produce the same error so that a caller cannot
    /// probe for bookings owned by other providers.
    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    /// The slot is already booked.
    #[error("Slot is already booked: {0}")]
    SlotAlreadyBooked(SlotId),

    /// The booking cannot move to `target` from its current status.
    #[error("Cannot mark booking {booking_id} as {target}: booking is {current}")]
    InvalidTransition {
        /// The booking being transitioned
        booking_id: BookingId,
        /// Status the booking currently has
        current: BookingStatus,
        /// Status that was requested
        target: BookingStatus,
    },

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SlotNotFound(_) | Self::BookingNotFound(_) => ErrorKind::NotFound,
            Self::SlotAlreadyBooked(_) => ErrorKind::Conflict,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Store(_) => ErrorKind::StoreFailure,
        }
    }
}

/// Errors raised by a [`BookingStore`](crate::store::BookingStore) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Could not obtain or keep a connection (pool exhausted, network, timeout).
    #[error("Store connection error: {0}")]
    Connection(String),

    /// A statement failed.
    #[error("Store query failed: {0}")]
    Query(String),

    /// A unique constraint rejected a write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A row could not be converted into a domain value.
    #[error("Failed to decode row: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether retrying the whole operation later could succeed.
    ///
    /// The engine never retries; this is for callers that choose to.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Errors raised while publishing a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The event could not be encoded.
    #[error("Failed to serialize event: {0}")]
    Serialization(String),

    /// The transport rejected or failed to deliver the message.
    #[error("Publish failed for destination '{destination}': {reason}")]
    Transport {
        /// Destination (topic or queue) the message was sent to
        destination: String,
        /// The reason for failure
        reason: String,
    },
}
