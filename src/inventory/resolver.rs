//! Stock precedence across the inventory shapes.
//!
//! Precedence, first match wins:
//! 1. point-product join row marked available
//! 2. ledger row marked listed
//! 3. the product's own quantity / in-stock flag, only when the point has no
//!    point-scoped row at all
//!
//! A point-scoped row that exists but is switched off makes the product
//! unavailable at that point; it never falls through to the catalog default.

use super::models::{LedgerRow, PointProductRow, ProductRow, StockLevel, StockSource};

pub fn resolve_stock(
    join: Option<&PointProductRow>,
    ledger: Option<&LedgerRow>,
    product: Option<&ProductRow>,
) -> StockLevel {
    if let Some(row) = join.filter(|r| r.is_available) {
        return StockLevel::new(row.quantity_available, true, StockSource::PointProduct);
    }

    if let Some(row) = ledger.filter(|r| r.is_listed) {
        return StockLevel::new(row.stock, true, StockSource::Ledger);
    }

    match (join, ledger, product) {
        (Some(_), _, _) => StockLevel::new(0, false, StockSource::PointProduct),
        (None, Some(_), _) => StockLevel::new(0, false, StockSource::Ledger),
        (None, None, Some(p)) => StockLevel::new(p.quantity, p.in_stock, StockSource::ProductDefault),
        (None, None, None) => StockLevel::unavailable(),
    }
}
