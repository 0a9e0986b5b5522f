//! # Slot Booking Testing
//!
//! Testing utilities for the slot booking service.
//!
//! This crate provides:
//! - [`InMemoryBookingStore`]: store with per-slot row locks and failure injection
//! - [`RecordingTransport`] / [`FailingTransport`]: notification transports for publish tests
//! - [`FixedClock`]: deterministic time
//! - [`fixtures`]: slot and booking builders
//!
//! ## Example
//!
//! ```ignore
//! use slot_booking_testing::{InMemoryBookingStore, RecordingTransport, fixtures, test_clock};
//!
//! #[tokio::test]
//! async fn reserve_publishes_booking_created() {
//!     let store = InMemoryBookingStore::new();
//!     let slot = store.insert_slot(fixtures::open_slot(ProviderId::new()));
//!     let transport = RecordingTransport::new();
//!     let engine = BookingEngine::new(
//!         Arc::new(store.clone()),
//!         NotificationPublisher::new(Arc::new(transport.clone()), "booking-events"),
//!         Arc::new(test_clock()),
//!     );
//!
//!     engine.reserve(slot.id, fixtures::user()).await?;
//!     assert!(transport.wait_for_messages(1, Duration::from_secs(1)).await);
//! }
//! ```

pub mod memory_store;
pub mod transports;

use chrono::{DateTime, Utc};
use slot_booking_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making event timestamps reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use slot_booking_testing::mocks::FixedClock;
    /// use slot_booking_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for slots, bookings and ids.
pub mod fixtures {
    use super::{DateTime, Utc};
    use chrono::{Duration, TimeZone};
    use slot_booking_core::{Booking, BookingId, BookingStatus, ProviderId, Slot, SlotId, UserId};

    /// Start of the first fixture slot (2025-03-01 09:00 UTC).
    #[must_use]
    pub fn slot_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// An unbooked 30-minute slot for `provider_id`.
    #[must_use]
    pub fn open_slot(provider_id: ProviderId) -> Slot {
        let start = slot_start();
        Slot {
            id: SlotId::new(),
            provider_id,
            start,
            end: start + Duration::minutes(30),
            is_booked: false,
        }
    }

    /// A fresh requester id.
    #[must_use]
    pub fn user() -> UserId {
        UserId::new()
    }

    /// A booking with random ids in `status`.
    #[must_use]
    pub fn booking(status: BookingStatus) -> Booking {
        let slot = open_slot(ProviderId::new());
        Booking {
            id: BookingId::new(),
            user_id: user(),
            provider_id: slot.provider_id,
            slot_id: slot.id,
            start: slot.start,
            end: slot.end,
            status,
        }
    }
}

/// Install a test-writer tracing subscriber once per process.
///
/// Respects `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use memory_store::{InMemoryBookingStore, InMemorySlotTransaction};
pub use mocks::{FixedClock, test_clock};
pub use transports::{FailingTransport, RecordingTransport};
