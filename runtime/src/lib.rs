//! # Slot Booking Runtime
//!
//! The reservation engine and the machinery around it.
//!
//! ## Core Components
//!
//! - **`BookingEngine`**: reserve / accept / reject / booking lookup
//! - **`NotificationPublisher`**: turns domain events into transport messages,
//!   dispatched on spawned tasks after commit
//! - **Metrics**: Prometheus counters and histograms for every operation
//!
//! ## Example
//!
//! ```ignore
//! use slot_booking_runtime::{BookingEngine, NotificationPublisher};
//! use slot_booking_core::environment::SystemClock;
//!
//! let engine = BookingEngine::new(
//!     Arc::new(PostgresBookingStore::new(pool)),
//!     NotificationPublisher::new(Arc::new(transport), "booking-events"),
//!     Arc::new(SystemClock),
//! );
//!
//! let booking = engine.reserve(slot_id, user_id).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Reserve and status-transition operations
pub mod engine;

/// Prometheus metrics for observability
pub mod metrics;

/// Fire-and-forget notification dispatch
pub mod publisher;

pub use engine::BookingEngine;
pub use publisher::{NotificationPublisher, ShutdownTimeout};
