//! Request DTOs for order API endpoints.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::cart::Cart;

use super::models::OrderStatus;

/// Checkout request
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    /// Idempotency key; resubmitting the same id returns the existing order
    #[serde(default)]
    pub order_id: Option<Uuid>,
    pub cart: Cart,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub pickup_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Query string for pickup-code lookups
#[derive(Debug, Default, Deserialize)]
pub struct CodeLookupQuery {
    #[serde(default)]
    pub producer_id: Option<Uuid>,
}
