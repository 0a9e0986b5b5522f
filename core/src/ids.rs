//! Strongly typed identifiers for slots, bookings, users and providers.
//!
//! Every identifier is an opaque newtype over a [`Uuid`]. Keeping them as
//! distinct types means a `ProviderId` can never be passed where a `UserId`
//! is expected, which matters for the ownership check on accept/reject.
//!
//! # Parsing
//!
//! - `FromStr::from_str()`: Validates input (used for external/user input)
//! - `From<Uuid>` and `new()`: No validation (application-controlled data)
//!
//! ```
//! use slot_booking_core::ids::SlotId;
//!
//! let id: SlotId = "67e55044-10b1-426f-9247-bb680e5fe0c8".parse().unwrap();
//! assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
//! assert!("not-a-uuid".parse::<SlotId>().is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when an identifier cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} id: {value:?}")]
pub struct ParseIdError {
    /// Which identifier type failed to parse
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ParseIdError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a bookable slot (a row of the `availability` table).
    SlotId,
    "slot"
);

define_id!(
    /// Identifier of a booking.
    BookingId,
    "booking"
);

define_id!(
    /// Identifier of the requester who reserves a slot.
    UserId,
    "user"
);

define_id!(
    /// Identifier of the provider offering slots.
    ProviderId,
    "provider"
);
