use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Booking, BookingDetail};
use crate::services::reservation::ReservationRequest;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}", get(get_booking))
}

/* ---------- BOOKINGS ---------- */

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingResponse {
    success: bool,
    booking: Booking,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    invalid_promo: Option<String>,
}

// POST /api/bookings
//
// Monetary fields are always computed server-side; any figures the client
// sends are ignored.
async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;

    let reservation = state.engine.reserve(request).await?;
    let invalid_promo = reservation.promo.invalid_code().map(str::to_string);

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            success: true,
            booking: reservation.booking,
            message: "Booking confirmed successfully",
            invalid_promo,
        }),
    ))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetail>, ApiError> {
    Ok(Json(state.engine.get_booking(id).await?))
}
