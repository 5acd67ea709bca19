use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/promo/validate", post(validate_promo))
}

#[derive(Debug, Deserialize)]
struct ValidatePromoRequest {
    code: Option<String>,
    subtotal: Option<i64>,
}

// POST /api/promo/validate
//
// Preview only: the discount is on the bare subtotal, before tax and without
// clamping. Bookings are always re-priced by the reservation engine.
async fn validate_promo(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ValidatePromoRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let (Some(code), Some(subtotal)) = (req.code.filter(|c| !c.trim().is_empty()), req.subtotal)
    else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "valid": false, "message": "Missing required fields" })),
        ));
    };

    let response = match state.pricing.promo_discount(subtotal, &code) {
        Ok(Some(promo)) => (
            StatusCode::OK,
            Json(json!({
                "valid": true,
                "discount": promo.discount,
                "description": promo.description,
            })),
        ),
        Ok(None) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "valid": false, "message": "Invalid promo code" })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "valid": false, "message": e.to_string() })),
        ),
    };
    Ok(response)
}
