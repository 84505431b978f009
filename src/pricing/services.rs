//! Pricing service functions with database access.
//!
//! Quotes are computed fresh on every call from the point row (cached), the
//! product row and the point-scoped override row.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cache::AppCache;
use crate::error::{AppError, Result};
use crate::inventory::models::{PointProductRow, ProductRow};
use crate::inventory::{queries as inventory_queries, read_stock, StockLevel};
use crate::models::PickupPoint;
use crate::schedule::{DiscountWindow, ScheduleError};

use super::calculators::PricingResolver;
use super::models::{PriceFields, PriceQuote};

/// A product as offered at one pickup point right now
#[derive(Debug, Clone, Serialize)]
pub struct Offer {
    pub point_id: Uuid,
    pub product_id: Uuid,
    pub name: Option<String>,
    /// `None` when prices could not be read
    pub quote: Option<PriceQuote>,
    pub stock: StockLevel,
}

/// Discount window for a product at a point.
///
/// Legacy per-product timestamps take precedence; otherwise the point's daily
/// discount hours apply.
pub fn discount_window_for(
    product: &ProductRow,
    point: &PickupPoint,
) -> std::result::Result<Option<DiscountWindow>, ScheduleError> {
    match DiscountWindow::from_legacy_timestamps(product.discount_start, product.discount_end)? {
        Some(window) => Ok(Some(window)),
        None => point.discount_window(),
    }
}

/// Quote a product at a point from already-loaded rows.
///
/// A malformed window is logged and the regular price is charged.
pub fn quote_product(
    resolver: &PricingResolver,
    point: &PickupPoint,
    product: &ProductRow,
    join: Option<&PointProductRow>,
    now: DateTime<Utc>,
) -> PriceQuote {
    let fields = PriceFields::resolve(product, join);
    match discount_window_for(product, point) {
        Ok(window) => resolver.quote(&fields, window.as_ref(), now),
        Err(e) => {
            tracing::error!(
                "Malformed discount window for product {} at point {}: {}",
                product.id,
                point.id,
                e
            );
            resolver.quote_without_discount(&fields)
        }
    }
}

/// Current price and stock of a product at a pickup point.
///
/// Missing point or product is `NotFound`. A failed price lookup degrades to an
/// offer without a quote and with unavailable stock.
pub async fn quote_offer(
    pool: &PgPool,
    cache: &AppCache,
    resolver: &PricingResolver,
    point_id: Uuid,
    product_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Offer> {
    let point = cache.point(pool, point_id).await?;

    let rows = tokio::try_join!(
        inventory_queries::find_point_product(pool, point_id, product_id),
        inventory_queries::find_product(pool, product_id),
    );

    let (join, product) = match rows {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(
                "Price lookup failed for point {} product {}: {}",
                point_id,
                product_id,
                e
            );
            return Ok(Offer {
                point_id,
                product_id,
                name: None,
                quote: None,
                stock: StockLevel::unavailable(),
            });
        }
    };

    let product = product
        .filter(|p| p.producer_id == point.producer_id)
        .ok_or(AppError::NotFound)?;

    let quote = quote_product(resolver, &point, &product, join.as_ref(), now);
    let stock = read_stock(pool, point_id, product_id).await;

    Ok(Offer {
        point_id,
        product_id,
        name: Some(product.name),
        quote: Some(quote),
        stock,
    })
}
