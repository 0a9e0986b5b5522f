//! HTTP request handlers.

pub mod bookings;
pub mod health;
pub mod metrics;

pub use health::health_check;
