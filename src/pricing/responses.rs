//! Response DTOs for pricing API endpoints.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::inventory::StockLevel;
use crate::schedule::DiscountPhase;

use super::services::Offer;

/// Quote as shown on a product card
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub regular_price: Decimal,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub discount_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str")]
    pub display_price: Decimal,
    pub is_discount_active: bool,
    pub discount_phase: DiscountPhase,
    pub discount_percent: u32,
    pub unit: String,
}

/// Response for an offer lookup
#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub point_id: Uuid,
    pub product_id: Uuid,
    pub name: Option<String>,
    pub quote: Option<QuoteResponse>,
    pub stock: StockLevel,
    pub available: bool,
}

impl From<Offer> for OfferResponse {
    fn from(offer: Offer) -> Self {
        let available = offer.quote.is_some() && offer.stock.is_available();
        Self {
            point_id: offer.point_id,
            product_id: offer.product_id,
            name: offer.name,
            quote: offer.quote.map(|q| QuoteResponse {
                regular_price: q.regular_price,
                discount_price: q.discount_price,
                display_price: q.display_price(),
                is_discount_active: q.is_discount_active,
                discount_phase: q.discount_phase,
                discount_percent: q.discount_percent(),
                unit: q.unit,
            }),
            stock: offer.stock,
            available,
        }
    }
}
