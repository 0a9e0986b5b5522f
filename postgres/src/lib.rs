//! `PostgreSQL` booking store for the slot booking service.
//!
//! This crate implements the `BookingStore` trait from `slot-booking-core`
//! on top of sqlx:
//!
//! - Slot claims serialized by `SELECT ... FOR UPDATE` row locks
//! - Conditional `UPDATE ... RETURNING` status transitions
//! - An explicitly configured connection pool ([`PoolConfig`])
//! - Embedded schema migrations (`migrations/`)
//!
//! # Example
//!
//! ```ignore
//! use slot_booking_postgres::{PoolConfig, PostgresBookingStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = PoolConfig::default().connect("postgres://localhost/booking").await?;
//!     let store = PostgresBookingStore::new(pool);
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod pool;
pub mod store;

pub use pool::PoolConfig;
pub use store::{PostgresBookingStore, PostgresSlotTransaction};
