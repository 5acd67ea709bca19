use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{ExperienceDetail, ExperienceSummary};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/experiences", get(list_experiences))
        .route("/experiences/{id}", get(get_experience_detail))
}

// GET /api/experiences
async fn list_experiences(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ExperienceSummary>>, ApiError> {
    let experiences = state.catalog.list_experiences().await?;
    tracing::debug!("Fetched {} experiences", experiences.len());
    Ok(Json(experiences))
}

// GET /api/experiences/{id}
async fn get_experience_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExperienceDetail>, ApiError> {
    Ok(Json(state.catalog.get_experience_detail(id).await?))
}
