//! HTTP routes

pub mod geocode;
pub mod inventory;
pub mod orders;
pub mod points;

use axum::{
    extract::State,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::cache::CacheStats;
use crate::AppState;

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/cache/stats", get(cache_stats))
        // Pickup points
        .route("/api/points/:id/status", get(points::status))
        .route("/api/points/:id/schedule", put(points::update_schedule))
        .route("/api/schedules/validate", post(points::validate))
        // Offers and stock
        .route(
            "/api/points/:point_id/products/:product_id/offer",
            get(inventory::offer),
        )
        .route(
            "/api/points/:point_id/products/:product_id/stock",
            put(inventory::set_stock),
        )
        .route("/api/points/:id/stock/changes", get(inventory::stock_changes))
        .route("/api/points/:id/sync", post(inventory::sync))
        .route("/api/inventory/migrate", post(inventory::migrate))
        // Orders
        .route("/api/orders", post(orders::place))
        .route("/api/orders/code/:code", get(orders::lookup))
        .route("/api/orders/:id/status", patch(orders::update_status))
        // Data entry
        .route("/api/geocode", post(geocode::lookup))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}
