//! Order route handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::orders::requests::{CodeLookupQuery, PlaceOrderRequest, UpdateStatusRequest};
use crate::orders::responses::{OrderView, PlacedOrder};
use crate::orders::services;
use crate::AppState;

/// Checkout; 201 for a new order, 200 when the order id was already placed
pub async fn place(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let placed = services::place_order(&state, request, Utc::now()).await?;
    let status = if placed.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(placed)))
}

/// The single order a pickup code refers to
pub async fn lookup(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<CodeLookupQuery>,
) -> Result<Json<OrderView>> {
    let view = services::lookup_by_code(&state, &code, query.producer_id).await?;
    Ok(Json(view))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderView>> {
    let view = services::update_status(&state, order_id, request.status).await?;
    Ok(Json(view))
}
