//! Composition root for the slot booking service.
//!
//! The binary in `main.rs` reads [`config::Config`], builds the pool, store,
//! transport and engine, and serves the router from `slot-booking-web`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;

pub use config::Config;

/// Default tracing filter when neither `LOG_LEVEL` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info,slot_booking=debug,sqlx=warn";
