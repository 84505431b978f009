//! Inventory rows and the resolved stock level.
//!
//! These models use sqlx's FromRow derive for direct database deserialization.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Point-product join row (`point_products`), the canonical write shape
#[derive(Debug, Clone, FromRow)]
pub struct PointProductRow {
    pub point_id: Uuid,
    pub product_id: Uuid,
    pub quantity_available: i32,
    pub is_available: bool,
    pub price_override: Option<Decimal>,
    pub discount_price_override: Option<Decimal>,
}

/// Legacy point inventory ledger row (`point_inventory`)
#[derive(Debug, Clone, FromRow)]
pub struct LedgerRow {
    pub point_id: Uuid,
    pub product_id: Uuid,
    pub stock: i32,
    pub bulk_qty: Option<i32>,
    pub is_listed: bool,
}

/// Producer catalog product (`products`)
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub producer_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub quantity: i32,
    pub in_stock: bool,
    pub unit: String,
    pub discount_start: Option<DateTime<Utc>>,
    pub discount_end: Option<DateTime<Utc>>,
}

/// Which storage shape a stock level was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockSource {
    PointProduct,
    Ledger,
    ProductDefault,
    /// Lookup failed or the product does not exist
    Unknown,
}

impl StockSource {
    /// Table name recorded alongside a deduction
    pub fn table(self) -> Option<&'static str> {
        match self {
            StockSource::PointProduct | StockSource::ProductDefault => Some("point_products"),
            StockSource::Ledger => Some("point_inventory"),
            StockSource::Unknown => None,
        }
    }
}

/// Resolved availability of one product at one pickup point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub quantity: u32,
    pub listed: bool,
    pub source: StockSource,
}

impl StockLevel {
    pub fn new(quantity: i32, listed: bool, source: StockSource) -> Self {
        Self {
            quantity: u32::try_from(quantity).unwrap_or(0),
            listed,
            source,
        }
    }

    /// "Cannot fulfill" result used for lookup faults and missing products
    pub fn unavailable() -> Self {
        Self {
            quantity: 0,
            listed: false,
            source: StockSource::Unknown,
        }
    }

    pub fn is_available(&self) -> bool {
        self.listed && self.quantity > 0
    }

    pub fn can_fulfill(&self, requested: u32) -> bool {
        self.listed && requested > 0 && requested <= self.quantity
    }

    /// Quantity a customer may actually buy
    pub fn purchasable(&self) -> u32 {
        if self.listed {
            self.quantity
        } else {
            0
        }
    }
}

/// Stock change pushed to subscribers of a pickup point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockChange {
    pub point_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
}

/// One line to deduct at order confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeductionLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_quantity_clamps_to_zero() {
        let level = StockLevel::new(-3, true, StockSource::Ledger);
        assert_eq!(level.quantity, 0);
        assert!(!level.is_available());
    }

    #[test]
    fn test_can_fulfill() {
        let level = StockLevel::new(5, true, StockSource::PointProduct);
        assert!(level.can_fulfill(5));
        assert!(!level.can_fulfill(6));
        assert!(!level.can_fulfill(0));

        let unlisted = StockLevel::new(5, false, StockSource::PointProduct);
        assert!(!unlisted.can_fulfill(1));
        assert_eq!(unlisted.purchasable(), 0);
    }

    #[test]
    fn test_unavailable() {
        let level = StockLevel::unavailable();
        assert_eq!(level.source, StockSource::Unknown);
        assert!(!level.is_available());
        assert_eq!(level.source.table(), None);
    }
}
