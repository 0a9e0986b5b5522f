//! Persistent store abstraction for slots and bookings.
//!
//! The reservation engine needs very little from its store:
//!
//! - A transaction in which a slot row can be read under an exclusive row lock,
//!   conditionally marked as booked, and paired with a freshly inserted booking
//! - Single-statement reads and conditional status updates for bookings
//!
//! The row lock taken by [`SlotTransaction::lock_slot`] is the only
//! concurrency-control primitive in the service. Two transactions locking the
//! same slot are serialized by the store; the second one observes whatever the
//! first committed.
//!
//! # Implementations
//!
//! - `PostgresBookingStore` (in `slot-booking-postgres`): Production implementation
//! - `InMemoryBookingStore` (in `slot-booking-testing`): Same locking semantics, for tests
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the
//! store can be shared as `Arc<dyn BookingStore>` and transactions handed out
//! as `Box<dyn SlotTransaction>`.
//!
//! # Example
//!
//! ```no_run
//! use slot_booking_core::store::BookingStore;
//! use slot_booking_core::{NewBooking, SlotId, UserId, StoreError};
//!
//! async fn claim(store: &dyn BookingStore, slot_id: SlotId, user_id: UserId) -> Result<(), StoreError> {
//!     let mut tx = store.begin().await?;
//!     if let Some(slot) = tx.lock_slot(slot_id).await? {
//!         if tx.mark_slot_booked(slot_id).await? == 1 {
//!             tx.insert_booking(NewBooking::for_slot(&slot, user_id)).await?;
//!             return tx.commit().await;
//!         }
//!     }
//!     tx.rollback().await
//! }
//! ```

use crate::booking::{Booking, NewBooking, Slot, StatusChange};
use crate::error::StoreError;
use crate::ids::{BookingId, ProviderId, SlotId};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// An open store transaction used by the reserve operation.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// its writes and releases its locks, exactly like [`rollback`](Self::rollback).
pub trait SlotTransaction: Send {
    /// Read a slot and hold an exclusive lock on its row until the transaction ends.
    ///
    /// Blocks while another transaction holds the lock. Returns `None` if the
    /// slot does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read or lock acquisition fails.
    fn lock_slot(&mut self, slot_id: SlotId) -> StoreFuture<'_, Option<Slot>>;

    /// Set `is_booked = true` on the slot, guarded by `is_booked = false`.
    ///
    /// Returns the number of affected rows: `1` on success, `0` if the slot is
    /// missing or already booked.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn mark_slot_booked(&mut self, slot_id: SlotId) -> StoreFuture<'_, u64>;

    /// Insert a new booking with status `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if a booking already references
    /// the slot, or another [`StoreError`] if the insert fails.
    fn insert_booking(&mut self, booking: NewBooking) -> StoreFuture<'_, Booking>;

    /// Commit all writes and release locks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails; nothing is persisted then.
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()>;

    /// Discard all writes and release locks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store could not be told to roll back.
    /// The transaction is abandoned either way.
    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()>;
}

/// Storage for slots and bookings.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store instance is shared by all
/// request tasks.
pub trait BookingStore: Send + Sync {
    /// Open a new transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if no connection is available.
    fn begin(&self) -> StoreFuture<'_, Box<dyn SlotTransaction>>;

    /// Load a booking by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_booking(&self, booking_id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Load a booking by id, only if it belongs to `provider_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_provider_booking(
        &self,
        booking_id: BookingId,
        provider_id: ProviderId,
    ) -> StoreFuture<'_, Option<Booking>>;

    /// Apply a conditional status update as a single atomic statement.
    ///
    /// Returns the updated booking, or `None` if no row matched the
    /// id/provider/current-status predicate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn update_booking_status(&self, change: StatusChange) -> StoreFuture<'_, Option<Booking>>;

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be reached.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
