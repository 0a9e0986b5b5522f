//! # Slot Booking Core
//!
//! Domain types and infrastructure traits for the slot booking service.
//!
//! A provider offers time slots; a requester reserves one, which creates a
//! `pending` booking; the provider then accepts or rejects it. Downstream
//! consumers learn about those changes through notifications.
//!
//! ## Core Concepts
//!
//! - **Slot**: A provider's bookable time window, claimed at most once
//! - **Booking**: A requester's claim on a slot, carrying a [`BookingStatus`]
//! - **Store**: Transactional persistence with row-level locking ([`store::BookingStore`])
//! - **Transport**: Outbound message delivery ([`notification::NotificationTransport`])
//! - **Domain events**: Immutable notification payloads ([`event::DomainEvent`])
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────┐     ┌──────────────────────┐
//! │ HTTP / caller│────▶│  BookingEngine     │────▶│  BookingStore        │
//! └──────────────┘     │  (runtime crate)   │     │  (postgres / memory) │
//!                      └─────────┬──────────┘     └──────────────────────┘
//!                                │ after commit (spawned)
//!                                ▼
//!                      ┌────────────────────┐     ┌──────────────────────┐
//!                      │ NotificationPublisher────▶│ NotificationTransport│
//!                      └────────────────────┘     └──────────────────────┘
//! ```
//!
//! This crate has no I/O of its own. Implementations live in
//! `slot-booking-postgres`, `slot-booking-redpanda` and `slot-booking-testing`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod booking;
pub mod error;
pub mod event;
pub mod ids;
pub mod notification;
pub mod store;

// Re-export commonly used types
pub use booking::{Booking, BookingStatus, NewBooking, Slot, StatusChange};
pub use chrono::{DateTime, Utc};
pub use error::{BookingError, ErrorKind, PublishError, StoreError};
pub use event::{BookingConfirmed, BookingRequested, DomainEvent};
pub use ids::{BookingId, ParseIdError, ProviderId, SlotId, UserId};

/// Environment module - injected dependencies that are not storage or transport.
///
/// All time reads in the engine go through [`environment::Clock`] so tests can
/// pin event timestamps.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_booking_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by [`Utc::now`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
