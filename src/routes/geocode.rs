//! Geocoding route handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, Result};
use crate::models::Coordinates;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GeocodeRequest {
    pub address: String,
    #[serde(default)]
    pub city: String,
    /// Store the result on this pickup point
    #[serde(default)]
    pub point_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GeocodeResponse {
    pub coordinates: Option<Coordinates>,
    pub stored: bool,
}

/// Resolve an address; optionally save it on a point
pub async fn lookup(
    State(state): State<AppState>,
    Json(request): Json<GeocodeRequest>,
) -> Result<Json<GeocodeResponse>> {
    let coordinates = state
        .geocoder
        .lookup(&request.address, &request.city)
        .await
        .map_err(|e| {
            tracing::warn!("Geocoding '{}' failed: {}", request.address, e);
            AppError::Internal(e.to_string())
        })?;

    let mut stored = false;
    if let (Some(point_id), Some(coords)) = (request.point_id, coordinates) {
        db::update_point_coordinates(&state.db, point_id, coords).await?;
        state.cache.invalidate_point(point_id).await;
        stored = true;
    }

    Ok(Json(GeocodeResponse { coordinates, stored }))
}
