//! In-memory caching using moka
//!
//! Caches pickup point rows (work hours, discount bounds). Points change only
//! through producer edits, which invalidate explicitly. Price quotes and stock
//! levels are never cached.

use moka::future::Cache;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::error::Result;
use crate::models::PickupPoint;

/// Application cache holding pickup points
#[derive(Clone)]
pub struct AppCache {
    /// Pickup points (id -> PickupPoint)
    pub points: Cache<Uuid, Arc<PickupPoint>>,
}

impl AppCache {
    /// Create a new cache instance with configured TTLs
    pub fn new() -> Self {
        Self {
            // Pickup points: 1000 entries, 10 min TTL, 5 min idle
            points: Cache::builder()
                .max_capacity(1000)
                .time_to_live(Duration::from_secs(10 * 60))
                .time_to_idle(Duration::from_secs(5 * 60))
                .build(),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            points_size: self.points.entry_count(),
        }
    }

    /// Invalidate a pickup point after a producer edit
    pub async fn invalidate_point(&self, point_id: Uuid) {
        self.points.invalidate(&point_id).await;
        info!("Cache invalidated for point: {}", point_id);
    }

    /// Cached point lookup, falling back to the database
    pub async fn point(&self, pool: &PgPool, point_id: Uuid) -> Result<Arc<PickupPoint>> {
        if let Some(cached) = self.points.get(&point_id).await {
            tracing::debug!("Cache HIT for point: {}", point_id);
            return Ok(cached);
        }

        tracing::debug!("Cache MISS for point: {}", point_id);
        let point = Arc::new(db::get_point(pool, point_id).await?);
        self.points.insert(point_id, Arc::clone(&point)).await;
        Ok(point)
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub points_size: u64,
}

/// Start background cache warmer
///
/// Warms the cache on startup and refreshes every 5 minutes.
pub async fn start_cache_warmer(cache: AppCache, db: PgPool) {
    let mut interval = interval(Duration::from_secs(5 * 60));
    loop {
        // First tick completes immediately
        interval.tick().await;
        warm_cache(&cache, &db).await;
    }
}

/// Warm the cache with active pickup points
async fn warm_cache(cache: &AppCache, db: &PgPool) {
    info!("Starting cache warm-up...");

    match db::get_active_points(db).await {
        Ok(points) => {
            for point in points {
                cache.points.insert(point.id, Arc::new(point)).await;
            }
        }
        Err(e) => warn!("Failed to warm point cache: {}", e),
    }

    info!("Cache warm-up complete. Stats: {:?}", cache.stats());
}
