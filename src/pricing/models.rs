//! Price inputs and the derived quote.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::inventory::models::{PointProductRow, ProductRow};
use crate::schedule::DiscountPhase;

use super::calculators::{discount_percentage, round_money};

/// Price fields after point-level overrides are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceFields {
    pub regular_price: Decimal,
    pub discount_price: Option<Decimal>,
    pub unit: String,
}

impl PriceFields {
    /// Point-scoped price overrides win over the catalog prices
    pub fn resolve(product: &ProductRow, join: Option<&PointProductRow>) -> Self {
        Self {
            regular_price: join
                .and_then(|j| j.price_override)
                .unwrap_or(product.price),
            discount_price: join
                .and_then(|j| j.discount_price_override)
                .or(product.discount_price),
            unit: product.unit.clone(),
        }
    }
}

/// Price charged for one unit at one instant. Derived per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    #[serde(with = "rust_decimal::serde::str")]
    pub regular_price: Decimal,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub discount_price: Option<Decimal>,
    pub is_discount_active: bool,
    pub discount_phase: DiscountPhase,
    pub unit: String,
}

impl PriceQuote {
    /// Unit price currently charged
    pub fn display_price(&self) -> Decimal {
        match self.discount_price {
            Some(discount) if self.is_discount_active => discount,
            _ => self.regular_price,
        }
    }

    /// Badge percentage; 0 when the discount is not active
    pub fn discount_percent(&self) -> u32 {
        if self.is_discount_active {
            discount_percentage(self.regular_price, self.discount_price)
        } else {
            0
        }
    }

    pub fn line_total(&self, quantity: u32) -> Decimal {
        round_money(self.display_price() * Decimal::from(quantity), 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn product() -> ProductRow {
        ProductRow {
            id: Uuid::nil(),
            producer_id: Uuid::nil(),
            name: "Плацинда".to_string(),
            price: dec!(30),
            discount_price: Some(dec!(20)),
            quantity: 10,
            in_stock: true,
            unit: "шт".to_string(),
            discount_start: None,
            discount_end: None,
        }
    }

    #[test]
    fn test_point_override_wins() {
        let join = PointProductRow {
            point_id: Uuid::nil(),
            product_id: Uuid::nil(),
            quantity_available: 3,
            is_available: true,
            price_override: Some(dec!(28)),
            discount_price_override: None,
        };
        let fields = PriceFields::resolve(&product(), Some(&join));
        assert_eq!(fields.regular_price, dec!(28));
        assert_eq!(fields.discount_price, Some(dec!(20)));
    }

    #[test]
    fn test_catalog_prices_without_join_row() {
        let fields = PriceFields::resolve(&product(), None);
        assert_eq!(fields.regular_price, dec!(30));
        assert_eq!(fields.unit, "шт");
    }

    #[test]
    fn test_line_total() {
        let quote = PriceQuote {
            regular_price: dec!(12.50),
            discount_price: Some(dec!(8.35)),
            is_discount_active: true,
            discount_phase: DiscountPhase::Active,
            unit: "шт".to_string(),
        };
        assert_eq!(quote.line_total(3), dec!(25.05));
    }

    #[test]
    fn test_quote_serializes_money_as_strings() {
        let quote = PriceQuote {
            regular_price: dec!(100.00),
            discount_price: None,
            is_discount_active: false,
            discount_phase: DiscountPhase::Inactive,
            unit: "кг".to_string(),
        };
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["regular_price"], "100.00");
        assert_eq!(json["discount_phase"], "inactive");
    }
}
