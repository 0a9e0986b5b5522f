//! The reservation engine.
//!
//! [`BookingEngine`] owns the three operations that mutate booking state:
//!
//! - [`reserve`](BookingEngine::reserve): claim a slot and create a `pending`
//!   booking in one transaction, serialized per slot by the store's row lock
//! - [`accept`](BookingEngine::accept) / [`reject`](BookingEngine::reject):
//!   move a `pending` booking to `confirmed` / `rejected` with one conditional
//!   update
//!
//! Notifications are dispatched only after the state change is durable, and
//! their outcome never reaches the caller.

use crate::metrics::{ReservationMetrics, TransitionMetrics};
use crate::publisher::NotificationPublisher;
use slot_booking_core::environment::Clock;
use slot_booking_core::error::Result;
use slot_booking_core::store::{BookingStore, SlotTransaction};
use slot_booking_core::{
    Booking, BookingError, BookingId, BookingStatus, DomainEvent, NewBooking, ProviderId, SlotId,
    StatusChange, StoreError, UserId,
};
use std::sync::Arc;
use std::time::Instant;

/// Coordinates the store and the notification publisher.
///
/// # Example
///
/// ```ignore
/// let engine = BookingEngine::new(store, publisher, Arc::new(SystemClock));
///
/// let booking = engine.reserve(slot_id, user_id).await?;
/// let booking = engine.accept(booking.id, booking.provider_id).await?;
/// assert_eq!(booking.status, BookingStatus::Confirmed);
/// ```
#[derive(Clone)]
pub struct BookingEngine {
    store: Arc<dyn BookingStore>,
    publisher: NotificationPublisher,
    clock: Arc<dyn Clock>,
}

impl BookingEngine {
    /// Create an engine.
    #[must_use]
    pub fn new(
        store: Arc<dyn BookingStore>,
        publisher: NotificationPublisher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn BookingStore {
        self.store.as_ref()
    }

    /// The notification publisher.
    #[must_use]
    pub const fn publisher(&self) -> &NotificationPublisher {
        &self.publisher
    }

    /// Claim `slot_id` for `user_id`, creating a `pending` booking.
    ///
    /// Of any number of concurrent calls for the same slot, exactly one
    /// succeeds. A `BOOKING_CREATED` notification is dispatched after commit.
    ///
    /// # Errors
    ///
    /// - [`BookingError::SlotNotFound`] if the slot does not exist
    /// - [`BookingError::SlotAlreadyBooked`] if another booking holds the slot
    /// - [`BookingError::Store`] if the store fails; the transaction is rolled
    ///   back and nothing is persisted
    #[tracing::instrument(skip_all, fields(slot_id = %slot_id, user_id = %user_id))]
    pub async fn reserve(&self, slot_id: SlotId, user_id: UserId) -> Result<Booking> {
        let started = Instant::now();
        let result = self.reserve_in_transaction(slot_id, user_id).await;
        ReservationMetrics::record(&result, started.elapsed());

        let booking = result?;
        tracing::info!(
            booking_id = %booking.id,
            provider_id = %booking.provider_id,
            "Slot reserved"
        );

        self.publisher
            .dispatch(DomainEvent::requested(&booking, self.clock.now()));
        Ok(booking)
    }

    async fn reserve_in_transaction(&self, slot_id: SlotId, user_id: UserId) -> Result<Booking> {
        let mut tx = self.store.begin().await?;

        match claim_slot(tx.as_mut(), slot_id, user_id).await {
            Ok(booking) => {
                tx.commit().await?;
                Ok(booking)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed, abandoning transaction");
                }
                tracing::debug!(error = %e, "Reserve rolled back");
                Err(e)
            }
        }
    }

    /// Confirm a `pending` booking owned by `provider_id`.
    ///
    /// A `BOOKING_CONFIRMED` notification is dispatched on success.
    ///
    /// # Errors
    ///
    /// - [`BookingError::BookingNotFound`] if the booking does not exist or
    ///   belongs to another provider
    /// - [`BookingError::InvalidTransition`] if the booking is not `pending`
    /// - [`BookingError::Store`] if the store fails
    #[tracing::instrument(skip_all, fields(booking_id = %booking_id, provider_id = %provider_id))]
    pub async fn accept(&self, booking_id: BookingId, provider_id: ProviderId) -> Result<Booking> {
        let booking = self
            .transition(booking_id, provider_id, BookingStatus::Confirmed)
            .await?;

        self.publisher
            .dispatch(DomainEvent::confirmed(&booking, self.clock.now()));
        Ok(booking)
    }

    /// Reject a `pending` booking owned by `provider_id`.
    ///
    /// No notification is sent for rejections.
    ///
    /// # Errors
    ///
    /// Same as [`accept`](Self::accept).
    #[tracing::instrument(skip_all, fields(booking_id = %booking_id, provider_id = %provider_id))]
    pub async fn reject(&self, booking_id: BookingId, provider_id: ProviderId) -> Result<Booking> {
        self.transition(booking_id, provider_id, BookingStatus::Rejected)
            .await
    }

    /// Look up a booking.
    ///
    /// # Errors
    ///
    /// - [`BookingError::BookingNotFound`] if it does not exist
    /// - [`BookingError::Store`] if the store fails
    pub async fn booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.store
            .find_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    async fn transition(
        &self,
        booking_id: BookingId,
        provider_id: ProviderId,
        target: BookingStatus,
    ) -> Result<Booking> {
        let result = self.apply_transition(booking_id, provider_id, target).await;
        TransitionMetrics::record(target, &result);

        if let Ok(booking) = &result {
            tracing::info!(status = %booking.status, "Booking status changed");
        }
        result
    }

    async fn apply_transition(
        &self,
        booking_id: BookingId,
        provider_id: ProviderId,
        target: BookingStatus,
    ) -> Result<Booking> {
        let current = self.owned_booking(booking_id, provider_id).await?;
        if !current.status.can_transition_to(target) {
            return Err(BookingError::InvalidTransition {
                booking_id,
                current: current.status,
                target,
            });
        }

        let change = StatusChange {
            booking_id,
            provider_id,
            from: current.status,
            to: target,
        };
        if let Some(updated) = self.store.update_booking_status(change).await? {
            return Ok(updated);
        }

        // A concurrent accept/reject got there first.
        let latest = self.owned_booking(booking_id, provider_id).await?;
        Err(BookingError::InvalidTransition {
            booking_id,
            current: latest.status,
            target,
        })
    }

    async fn owned_booking(&self, booking_id: BookingId, provider_id: ProviderId) -> Result<Booking> {
        self.store
            .find_provider_booking(booking_id, provider_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }
}

/// Claim the slot and insert its booking inside an open transaction.
async fn claim_slot(
    tx: &mut dyn SlotTransaction,
    slot_id: SlotId,
    user_id: UserId,
) -> Result<Booking> {
    let slot = tx
        .lock_slot(slot_id)
        .await?
        .ok_or(BookingError::SlotNotFound(slot_id))?;

    if slot.is_booked {
        return Err(BookingError::SlotAlreadyBooked(slot_id));
    }

    // Guarded by is_booked = false; zero rows means someone else holds it.
    if tx.mark_slot_booked(slot_id).await? == 0 {
        return Err(BookingError::SlotAlreadyBooked(slot_id));
    }

    tx.insert_booking(NewBooking::for_slot(&slot, user_id))
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => BookingError::SlotAlreadyBooked(slot_id),
            other => BookingError::Store(other),
        })
}

impl std::fmt::Debug for BookingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEngine")
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}
