//! Offer and stock route handlers

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::inventory::{services, FeedEvent, StockChange, StockLevel};
use crate::pricing::requests::OfferQuery;
use crate::pricing::responses::OfferResponse;
use crate::pricing::quote_offer;
use crate::AppState;

/// Longest a stock long-poll may wait
const MAX_WAIT_SECS: u64 = 60;

/// Current price and stock of a product at a point
pub async fn offer(
    State(state): State<AppState>,
    Path((point_id, product_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<OfferQuery>,
) -> Result<Json<OfferResponse>> {
    let now = query.as_of.unwrap_or_else(Utc::now);
    let offer = quote_offer(
        &state.db,
        &state.cache,
        &state.pricing,
        point_id,
        product_id,
        now,
    )
    .await?;
    Ok(Json(offer.into()))
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub quantity: i32,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Producer edit of a point's stock
pub async fn set_stock(
    State(state): State<AppState>,
    Path((point_id, product_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SetStockRequest>,
) -> Result<Json<StockLevel>> {
    if request.quantity < 0 {
        return Err(AppError::Validation("Quantity must not be negative".to_string()));
    }
    state.cache.point(&state.db, point_id).await?;

    let level = services::set_point_stock(
        &state.db,
        &state.feed,
        point_id,
        product_id,
        request.quantity,
        request.is_available,
    )
    .await?;
    Ok(Json(level))
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub rows: u64,
}

/// Reset a point's stock from the producer catalog
pub async fn sync(
    State(state): State<AppState>,
    Path(point_id): Path<Uuid>,
) -> Result<Json<SyncResponse>> {
    let point = state.cache.point(&state.db, point_id).await?;
    let rows = services::sync_point(&state.db, point_id, point.producer_id).await?;
    state.feed.publish_resync(Some(point_id));
    Ok(Json(SyncResponse { rows }))
}

/// Fold legacy ledger rows into the point-product table
pub async fn migrate(State(state): State<AppState>) -> Result<Json<SyncResponse>> {
    let rows = services::migrate_ledger(&state.db).await?;
    state.feed.publish_resync(None);
    Ok(Json(SyncResponse { rows }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangesQuery {
    /// Comma-separated product ids; empty means every product at the point
    #[serde(default)]
    pub products: Option<String>,
    #[serde(default)]
    pub wait_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ChangeResponse {
    pub resync: bool,
    pub change: Option<StockChange>,
}

fn parse_product_ids(raw: Option<&str>) -> Result<Vec<Uuid>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Uuid>()
                .map_err(|_| AppError::Validation(format!("Invalid product id '{}'", s)))
        })
        .collect()
}

/// Long-poll for the next stock change at a point; 204 when nothing arrives
pub async fn stock_changes(
    State(state): State<AppState>,
    Path(point_id): Path<Uuid>,
    Query(query): Query<ChangesQuery>,
) -> Result<Response> {
    let products = parse_product_ids(query.products.as_deref())?;
    let wait = Duration::from_secs(query.wait_secs.unwrap_or(25).min(MAX_WAIT_SECS));

    let mut subscription = state.feed.subscribe(point_id, products);
    let event = tokio::time::timeout(wait, subscription.recv()).await;

    let body = match event {
        Ok(Some(FeedEvent::Changed(change))) => ChangeResponse {
            resync: false,
            change: Some(change),
        },
        Ok(Some(FeedEvent::Resync)) => ChangeResponse {
            resync: true,
            change: None,
        },
        Ok(None) | Err(_) => return Ok(StatusCode::NO_CONTENT.into_response()),
    };
    Ok(Json(body).into_response())
}
