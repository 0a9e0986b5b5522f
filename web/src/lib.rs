//! Axum HTTP surface for the slot booking service.
//!
//! Handlers are a thin shell: they parse and validate the request, call the
//! [`BookingEngine`](slot_booking_runtime::BookingEngine) and map the result
//! onto a response. Business rules live in the engine.
//!
//! # Routes
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | `POST` | `/bookings` | [`handlers::bookings::create_booking`] |
//! | `GET` | `/bookings/:id` | [`handlers::bookings::get_booking`] |
//! | `POST` | `/bookings/:id/accept` | [`handlers::bookings::accept_booking`] |
//! | `POST` | `/bookings/:id/reject` | [`handlers::bookings::reject_booking`] |
//! | `GET` | `/health` | [`handlers::health::readiness`] |
//! | `GET` | `/health/live` | [`handlers::health::health_check`] |
//! | `GET` | `/metrics` | [`handlers::metrics::metrics`] |
//!
//! # Example
//!
//! ```ignore
//! use slot_booking_web::{AppState, router};
//!
//! let app = router(AppState::new(engine));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod state;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Build the service router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/bookings", post(handlers::bookings::create_booking))
        .route("/bookings/:id", get(handlers::bookings::get_booking))
        .route("/bookings/:id/accept", post(handlers::bookings::accept_booking))
        .route("/bookings/:id/reject", post(handlers::bookings::reject_booking))
        .route("/health", get(handlers::health::readiness))
        .route("/health/live", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
