//! In-memory booking store for fast, deterministic tests.
//!
//! Mirrors the locking behaviour of the Postgres store closely enough for
//! concurrency tests:
//!
//! - Every slot has its own async row lock. [`SlotTransaction::lock_slot`]
//!   waits for it and the transaction keeps it until commit, rollback or drop.
//! - Writes made inside a transaction are staged and only become visible on
//!   commit. Dropping a transaction discards them.
//! - One booking per slot is enforced at insert and again at commit.
//!
//! Failure injection ([`InMemoryBookingStore::fail_next_booking_insert`],
//! [`InMemoryBookingStore::set_unavailable`]) lets tests drive error paths.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use chrono::{DateTime, Utc};
use slot_booking_core::store::{BookingStore, SlotTransaction, StoreFuture};
use slot_booking_core::{
    Booking, BookingId, BookingStatus, NewBooking, ProviderId, Slot, SlotId, StatusChange,
    StoreError,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type RowLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug)]
struct SlotRow {
    slot: Slot,
    lock: RowLock,
}

#[derive(Debug, Default)]
struct State {
    slots: HashMap<SlotId, SlotRow>,
    bookings: HashMap<BookingId, Booking>,
}

impl State {
    fn slot_taken(&self, slot_id: SlotId) -> bool {
        self.bookings.values().any(|b| b.slot_id == slot_id)
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    fail_next_insert: AtomicBool,
    unavailable: AtomicBool,
}

/// In-memory [`BookingStore`] with per-slot row locks.
///
/// Cloning is cheap and clones share the same data.
///
/// # Example
///
/// ```
/// use slot_booking_testing::{InMemoryBookingStore, fixtures};
/// use slot_booking_core::ProviderId;
///
/// let store = InMemoryBookingStore::new();
/// let slot = store.insert_slot(fixtures::open_slot(ProviderId::new()));
///
/// assert!(!store.slot(slot.id).unwrap().is_booked);
/// assert!(store.bookings_for_slot(slot.id).is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryBookingStore {
    inner: Arc<Inner>,
}

impl InMemoryBookingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot and return it.
    pub fn insert_slot(&self, slot: Slot) -> Slot {
        let mut state = self.inner.state.lock().unwrap();
        state.slots.insert(
            slot.id,
            SlotRow {
                slot: slot.clone(),
                lock: Arc::new(tokio::sync::Mutex::new(())),
            },
        );
        slot
    }

    /// Add an unbooked slot for `provider_id` covering `start..end`.
    pub fn add_slot(&self, provider_id: ProviderId, start: DateTime<Utc>, end: DateTime<Utc>) -> Slot {
        self.insert_slot(Slot {
            id: SlotId::new(),
            provider_id,
            start,
            end,
            is_booked: false,
        })
    }

    /// Committed state of a slot.
    #[must_use]
    pub fn slot(&self, slot_id: SlotId) -> Option<Slot> {
        let state = self.inner.state.lock().unwrap();
        state.slots.get(&slot_id).map(|row| row.slot.clone())
    }

    /// Committed state of a booking.
    #[must_use]
    pub fn booking(&self, booking_id: BookingId) -> Option<Booking> {
        self.inner.state.lock().unwrap().bookings.get(&booking_id).cloned()
    }

    /// All committed bookings that reference `slot_id`.
    #[must_use]
    pub fn bookings_for_slot(&self, slot_id: SlotId) -> Vec<Booking> {
        let state = self.inner.state.lock().unwrap();
        state
            .bookings
            .values()
            .filter(|b| b.slot_id == slot_id)
            .cloned()
            .collect()
    }

    /// Number of committed bookings.
    #[must_use]
    pub fn booking_count(&self) -> usize {
        self.inner.state.lock().unwrap().bookings.len()
    }

    /// Make the next `insert_booking` call fail with a query error.
    pub fn fail_next_booking_insert(&self) {
        self.inner.fail_next_insert.store(true, Ordering::SeqCst);
    }

    /// Simulate a lost connection: every operation fails with
    /// [`StoreError::Connection`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn row_lock(&self, slot_id: SlotId) -> Option<RowLock> {
        let state = self.inner.state.lock().unwrap();
        state.slots.get(&slot_id).map(|row| Arc::clone(&row.lock))
    }
}

impl BookingStore for InMemoryBookingStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn SlotTransaction>> {
        Box::pin(async move {
            self.check_available()?;
            let tx: Box<dyn SlotTransaction> = Box::new(InMemorySlotTransaction {
                store: self.clone(),
                locks: HashMap::new(),
                booked: HashSet::new(),
                inserted: Vec::new(),
            });
            Ok(tx)
        })
    }

    fn find_booking(&self, booking_id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.booking(booking_id))
        })
    }

    fn find_provider_booking(
        &self,
        booking_id: BookingId,
        provider_id: ProviderId,
    ) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self
                .booking(booking_id)
                .filter(|b| b.provider_id == provider_id))
        })
    }

    fn update_booking_status(&self, change: StatusChange) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            self.check_available()?;
            let mut state = self.inner.state.lock().unwrap();
            let updated = state.bookings.get_mut(&change.booking_id).and_then(|booking| {
                if booking.provider_id == change.provider_id && booking.status == change.from {
                    booking.status = change.to;
                    Some(booking.clone())
                } else {
                    None
                }
            });
            Ok(updated)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check_available() })
    }
}

/// Transaction over an [`InMemoryBookingStore`].
///
/// Holds the row locks it acquired until it is committed, rolled back or
/// dropped.
#[derive(Debug)]
pub struct InMemorySlotTransaction {
    store: InMemoryBookingStore,
    locks: HashMap<SlotId, OwnedMutexGuard<()>>,
    booked: HashSet<SlotId>,
    inserted: Vec<Booking>,
}

impl InMemorySlotTransaction {
    /// Wait for the row lock on `slot_id` unless this transaction holds it.
    /// Returns `false` if the slot does not exist.
    async fn acquire(&mut self, slot_id: SlotId) -> bool {
        if self.locks.contains_key(&slot_id) {
            return true;
        }
        let Some(lock) = self.store.row_lock(slot_id) else {
            return false;
        };
        let guard = lock.lock_owned().await;
        self.locks.insert(slot_id, guard);
        true
    }
}

impl SlotTransaction for InMemorySlotTransaction {
    fn lock_slot(&mut self, slot_id: SlotId) -> StoreFuture<'_, Option<Slot>> {
        Box::pin(async move {
            self.store.check_available()?;
            if !self.acquire(slot_id).await {
                return Ok(None);
            }
            let staged = self.booked.contains(&slot_id);
            Ok(self.store.slot(slot_id).map(|mut slot| {
                slot.is_booked |= staged;
                slot
            }))
        })
    }

    fn mark_slot_booked(&mut self, slot_id: SlotId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            self.store.check_available()?;
            if !self.acquire(slot_id).await || self.booked.contains(&slot_id) {
                return Ok(0);
            }
            match self.store.slot(slot_id) {
                Some(slot) if !slot.is_booked => {
                    self.booked.insert(slot_id);
                    Ok(1)
                }
                _ => Ok(0),
            }
        })
    }

    fn insert_booking(&mut self, booking: NewBooking) -> StoreFuture<'_, Booking> {
        Box::pin(async move {
            self.store.check_available()?;
            if self.store.inner.fail_next_insert.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Query("injected booking insert failure".to_string()));
            }

            let staged_dup = self.inserted.iter().any(|b| b.slot_id == booking.slot_id);
            let committed_dup = self.store.inner.state.lock().unwrap().slot_taken(booking.slot_id);
            if staged_dup || committed_dup {
                return Err(StoreError::UniqueViolation(format!(
                    "bookings_slot_id_key: slot {} already has a booking",
                    booking.slot_id
                )));
            }

            let created = Booking {
                id: BookingId::new(),
                user_id: booking.user_id,
                provider_id: booking.provider_id,
                slot_id: booking.slot_id,
                start: booking.start,
                end: booking.end,
                status: BookingStatus::Pending,
            };
            self.inserted.push(created.clone());
            Ok(created)
        })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            let this = *self;
            this.store.check_available()?;

            let mut state = this.store.inner.state.lock().unwrap();
            if let Some(dup) = this.inserted.iter().find(|b| state.slot_taken(b.slot_id)) {
                return Err(StoreError::UniqueViolation(format!(
                    "bookings_slot_id_key: slot {} already has a booking",
                    dup.slot_id
                )));
            }
            for slot_id in &this.booked {
                if let Some(row) = state.slots.get_mut(slot_id) {
                    row.slot.is_booked = true;
                }
            }
            for booking in this.inserted {
                state.bookings.insert(booking.id, booking);
            }
            drop(state);
            drop(this.locks);
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            drop(self);
            Ok(())
        })
    }
}
