//! `PostgreSQL` implementation of [`BookingStore`].
//!
//! # Locking
//!
//! The reserve transaction reads the slot with `SELECT ... FOR UPDATE`. A
//! second transaction locking the same row blocks until the first commits or
//! rolls back and then reads the committed `is_booked`. The `UNIQUE (slot_id)`
//! constraint on `bookings` backs this up at the schema level.
//!
//! Status transitions are one conditional `UPDATE ... RETURNING`, so no
//! explicit transaction is needed for them.

use chrono::{DateTime, Utc};
use slot_booking_core::store::{BookingStore, SlotTransaction, StoreFuture};
use slot_booking_core::{
    Booking, BookingId, BookingStatus, NewBooking, ProviderId, Slot, SlotId, StatusChange, StoreError, UserId,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const BOOKING_COLUMNS: &str = "id, user_id, provider_id, slot_id, slot_start, slot_end, status";

/// Lock and serialization failures that retrying could resolve.
const TRANSIENT_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
    "57014", // query_canceled (statement_timeout)
];

/// Map a driver error onto the store error taxonomy.
pub(crate) fn store_error(context: &str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::UniqueViolation(format!("{context}: {db}"))
        }
        sqlx::Error::Database(db)
            if db
                .code()
                .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&&*code)) =>
        {
            StoreError::Connection(format!("{context}: {db}"))
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => StoreError::Connection(format!("{context}: {e}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Decode(format!("{context}: {e}"))
        }
        _ => StoreError::Query(format!("{context}: {e}")),
    }
}

#[derive(sqlx::FromRow)]
struct SlotRow {
    id: Uuid,
    provider_id: Uuid,
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    is_booked: bool,
}

impl From<SlotRow> for Slot {
    fn from(row: SlotRow) -> Self {
        Self {
            id: SlotId::from_uuid(row.id),
            provider_id: ProviderId::from_uuid(row.provider_id),
            start: row.slot_start,
            end: row.slot_end,
            is_booked: row.is_booked,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    provider_id: Uuid,
    slot_id: Uuid,
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    status: String,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<BookingStatus>()
            .map_err(|e| StoreError::Decode(format!("booking {}: {e}", row.id)))?;

        Ok(Self {
            id: BookingId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            provider_id: ProviderId::from_uuid(row.provider_id),
            slot_id: SlotId::from_uuid(row.slot_id),
            start: row.slot_start,
            end: row.slot_end,
            status,
        })
    }
}

/// `PostgreSQL` booking store.
///
/// # Example
///
/// ```no_run
/// use slot_booking_postgres::{PoolConfig, PostgresBookingStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PoolConfig::default().connect("postgres://localhost/booking").await?;
/// let store = PostgresBookingStore::new(pool);
/// store.migrate().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Insert a provider and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub async fn create_provider(&self, name: &str) -> Result<ProviderId, StoreError> {
        let id: Uuid = sqlx::query_scalar("INSERT INTO providers (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("Failed to create provider", e))?;
        Ok(ProviderId::from_uuid(id))
    }

    /// Insert a user and return its id. `phone` is optional contact data.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if the email is taken, or
    /// another [`StoreError`] if the insert fails.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<UserId, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (name, email, phone) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to create user", e))?;
        Ok(UserId::from_uuid(id))
    }

    /// Offer a new, unbooked slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails (unknown provider, or
    /// `start >= end`).
    pub async fn create_slot(
        &self,
        provider_id: ProviderId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Slot, StoreError> {
        let row = sqlx::query_as::<_, SlotRow>(
            r"
            INSERT INTO availability (provider_id, slot_start, slot_end)
            VALUES ($1, $2, $3)
            RETURNING id, provider_id, slot_start, slot_end, is_booked
            ",
        )
        .bind(provider_id.as_uuid())
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to create slot", e))?;
        Ok(row.into())
    }

    /// Read a slot without locking it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub async fn find_slot(&self, slot_id: SlotId) -> Result<Option<Slot>, StoreError> {
        let row = sqlx::query_as::<_, SlotRow>(
            "SELECT id, provider_id, slot_start, slot_end, is_booked FROM availability WHERE id = $1",
        )
        .bind(slot_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load slot", e))?;
        Ok(row.map(Slot::from))
    }

    /// Count bookings referencing `slot_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub async fn count_slot_bookings(&self, slot_id: SlotId) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE slot_id = $1")
            .bind(slot_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("Failed to count bookings", e))
    }
}

impl BookingStore for PostgresBookingStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn SlotTransaction>> {
        Box::pin(async move {
            let tx = self
                .pool
                .begin()
                .await
                .map_err(|e| store_error("Failed to begin transaction", e))?;
            let tx: Box<dyn SlotTransaction> = Box::new(PostgresSlotTransaction { tx });
            Ok(tx)
        })
    }

    fn find_booking(&self, booking_id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
            sqlx::query_as::<_, BookingRow>(&sql)
                .bind(booking_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to load booking", e))?
                .map(Booking::try_from)
                .transpose()
        })
    }

    fn find_provider_booking(
        &self,
        booking_id: BookingId,
        provider_id: ProviderId,
    ) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let sql =
                format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 AND provider_id = $2");
            sqlx::query_as::<_, BookingRow>(&sql)
                .bind(booking_id.as_uuid())
                .bind(provider_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to load booking", e))?
                .map(Booking::try_from)
                .transpose()
        })
    }

    fn update_booking_status(&self, change: StatusChange) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let sql = format!(
                "UPDATE bookings SET status = $1, updated_at = now() \
                 WHERE id = $2 AND provider_id = $3 AND status = $4 \
                 RETURNING {BOOKING_COLUMNS}"
            );
            sqlx::query_as::<_, BookingRow>(&sql)
                .bind(change.to.as_str())
                .bind(change.booking_id.as_uuid())
                .bind(change.provider_id.as_uuid())
                .bind(change.from.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to update booking status", e))?
                .map(Booking::try_from)
                .transpose()
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| store_error("Health check failed", e))?;
            Ok(())
        })
    }
}

/// An open `PostgreSQL` transaction for the reserve operation.
///
/// Dropping it without committing rolls back (sqlx issues `ROLLBACK` when the
/// connection returns to the pool).
pub struct PostgresSlotTransaction {
    tx: Transaction<'static, Postgres>,
}

impl SlotTransaction for PostgresSlotTransaction {
    fn lock_slot(&mut self, slot_id: SlotId) -> StoreFuture<'_, Option<Slot>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, SlotRow>(
                r"
                SELECT id, provider_id, slot_start, slot_end, is_booked
                FROM availability
                WHERE id = $1
                FOR UPDATE
                ",
            )
            .bind(slot_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to lock slot", e))?;
            Ok(row.map(Slot::from))
        })
    }

    fn mark_slot_booked(&mut self, slot_id: SlotId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE availability SET is_booked = TRUE WHERE id = $1 AND is_booked = FALSE",
            )
            .bind(slot_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to mark slot booked", e))?;
            Ok(result.rows_affected())
        })
    }

    fn insert_booking(&mut self, booking: NewBooking) -> StoreFuture<'_, Booking> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO bookings (user_id, provider_id, slot_id, slot_start, slot_end, status) \
                 VALUES ($1, $2, $3, $4, $5, 'pending') \
                 RETURNING {BOOKING_COLUMNS}"
            );
            let row = sqlx::query_as::<_, BookingRow>(&sql)
                .bind(booking.user_id.as_uuid())
                .bind(booking.provider_id.as_uuid())
                .bind(booking.slot_id.as_uuid())
                .bind(booking.start)
                .bind(booking.end)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| store_error("Failed to insert booking", e))?;
            Booking::try_from(row)
        })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            self.tx
                .commit()
                .await
                .map_err(|e| store_error("Failed to commit transaction", e))
        })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            self.tx
                .rollback()
                .await
                .map_err(|e| store_error("Failed to roll back transaction", e))
        })
    }
}
