//! Booking endpoints.
//!
//! ```text
//! POST /bookings               {slotId, userId}   → 201 booking
//! GET  /bookings/:id                              → 200 booking
//! POST /bookings/:id/accept    {providerId}       → 200 booking
//! POST /bookings/:id/reject    {providerId}       → 200 booking
//! ```
//!
//! Identifiers in the body that are missing, blank or malformed are a 400.
//! A malformed booking id in the path is a 404: no such booking can exist.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use slot_booking_core::{Booking, BookingId, ParseIdError, ProviderId, SlotId, UserId};
use std::str::FromStr;

/// Body of `POST /bookings`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Slot to reserve
    pub slot_id: Option<String>,
    /// Requester
    pub user_id: Option<String>,
}

/// Body of `POST /bookings/:id/accept` and `/reject`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    /// Provider acting on the booking
    pub provider_id: Option<String>,
}

fn required_id<T>(value: Option<&str>, field: &str) -> Result<T, AppError>
where
    T: FromStr<Err = ParseIdError>,
{
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("{field} is required")))?;
    raw.parse()
        .map_err(|e: ParseIdError| AppError::bad_request(format!("{field}: {e}")))
}

fn path_booking_id(raw: &str) -> Result<BookingId, AppError> {
    raw.parse().map_err(|_| AppError::not_found("Booking", raw))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// Reserve a slot.
///
/// # Errors
///
/// 400 for a bad body, 404 for an unknown slot, 409 if the slot is taken,
/// 503/500 on store failure.
pub async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let request = json_body(payload)?;
    let slot_id: SlotId = required_id(request.slot_id.as_deref(), "slotId")?;
    let user_id: UserId = required_id(request.user_id.as_deref(), "userId")?;

    let booking = state.engine.reserve(slot_id, user_id).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Look up a booking.
///
/// # Errors
///
/// 404 if the booking does not exist, 503/500 on store failure.
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking_id = path_booking_id(&id)?;
    Ok(Json(state.engine.booking(booking_id).await?))
}

/// Accept a pending booking.
///
/// # Errors
///
/// 400 for a bad body, 404 if the booking is unknown or owned by another
/// provider, 409 if it is no longer pending.
pub async fn accept_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let booking_id = path_booking_id(&id)?;
    let request = json_body(payload)?;
    let provider_id: ProviderId = required_id(request.provider_id.as_deref(), "providerId")?;

    Ok(Json(state.engine.accept(booking_id, provider_id).await?))
}

/// Reject a pending booking.
///
/// # Errors
///
/// Same as [`accept_booking`].
pub async fn reject_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let booking_id = path_booking_id(&id)?;
    let request = json_body(payload)?;
    let provider_id: ProviderId = required_id(request.provider_id.as_deref(), "providerId")?;

    Ok(Json(state.engine.reject(booking_id, provider_id).await?))
}
