//! Inventory service functions with database access.

use std::future::Future;
use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;

use super::feed::StockFeed;
use super::models::{StockChange, StockLevel};
use super::queries;
use super::resolver::resolve_stock;
use super::DeductionError;

/// Read the available stock of a product at a pickup point.
///
/// Never fails: any lookup fault is logged and reported as unavailable, so
/// callers treat "unknown" as "cannot fulfill".
pub async fn read_stock(pool: &PgPool, point_id: Uuid, product_id: Uuid) -> StockLevel {
    let lookups = tokio::try_join!(
        queries::find_point_product(pool, point_id, product_id),
        queries::find_ledger_row(pool, point_id, product_id),
        queries::find_product(pool, product_id),
    );

    match lookups {
        Ok((join, ledger, product)) => resolve_stock(join.as_ref(), ledger.as_ref(), product.as_ref()),
        Err(e) => {
            tracing::warn!(
                "Stock lookup failed for point {} product {}: {}",
                point_id,
                product_id,
                e
            );
            StockLevel::unavailable()
        }
    }
}

/// Errors that may clear up when the same operation is run again
pub trait Transient: std::fmt::Display {
    /// Whether retrying the same idempotent operation may succeed
    fn is_transient(&self) -> bool;
}

/// Run a side-effecting database operation, retrying transient faults.
///
/// The operation must be idempotent (keyed by order id). Business rejections
/// such as insufficient stock are returned immediately.
pub async fn retry_transient<T, E, F, Fut>(attempts: u32, mut op: F) -> Result<T, E>
where
    E: Transient,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                let backoff = Duration::from_millis(50 * 2u64.pow(attempt - 1));
                tracing::warn!(
                    "Transient inventory failure (attempt {}/{}): {}; retrying in {:?}",
                    attempt,
                    attempts,
                    e,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Producer-side inventory edit; publishes the new level
pub async fn set_point_stock(
    pool: &PgPool,
    feed: &StockFeed,
    point_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    is_available: bool,
) -> Result<StockLevel, sqlx::Error> {
    queries::upsert_point_stock(pool, point_id, product_id, quantity, is_available).await?;
    let level = read_stock(pool, point_id, product_id).await;
    feed.publish(StockChange {
        point_id,
        product_id,
        quantity: level.purchasable(),
    });
    Ok(level)
}

/// Reset a point's stock to the producer's catalog quantities
pub async fn sync_point(
    pool: &PgPool,
    point_id: Uuid,
    producer_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let rows = queries::sync_point_from_catalog(pool, point_id, producer_id).await?;
    tracing::info!("Synced {} catalog rows into point {}", rows, point_id);
    Ok(rows)
}

/// One-off fold of legacy ledger rows into the join table
pub async fn migrate_ledger(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let rows = queries::migrate_ledger_rows(pool).await?;
    tracing::info!("Migrated {} ledger rows into point_products", rows);
    Ok(rows)
}
