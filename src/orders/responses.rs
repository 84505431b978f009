//! Response DTOs for order API endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::models::{OrderItem, OrderRow, OrderStatus};

/// Order as shown to the customer and at the pickup counter
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub code: String,
    pub status: OrderStatus,
    pub status_label: &'static str,
    pub point_id: Uuid,
    pub point_name: Option<String>,
    pub point_address: Option<String>,
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    pub customer_name: String,
    pub pickup_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// PNG data URI of the pickup code
    pub qr: Option<String>,
}

impl OrderView {
    pub fn new(order: OrderRow) -> Self {
        Self {
            id: order.id,
            status_label: order.status.label(),
            status: order.status,
            point_id: order.point_id,
            point_name: None,
            point_address: None,
            items: order.items.0,
            total: order.total,
            customer_name: order.customer_name,
            pickup_time: order.pickup_time,
            created_at: order.created_at,
            qr: None,
            code: order.code,
        }
    }
}

/// Response to a checkout
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: OrderView,
    /// `false` when the request repeated an already-placed order id
    pub created: bool,
}
