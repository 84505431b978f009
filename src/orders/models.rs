//! Order models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Ready,
    Completed,
    Cancelled,
}

/// Statuses excluded from the order-code collision set
pub const TERMINAL_STATUSES: [OrderStatus; 2] = [OrderStatus::Completed, OrderStatus::Cancelled];

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        TERMINAL_STATUSES.contains(&self)
    }

    /// pending -> confirmed -> ready -> completed; any open status may be cancelled
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Ready)
                | (Ready, Completed)
                | (Pending | Confirmed | Ready, Cancelled)
        )
    }

    /// Russian label used in notifications
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Новый",
            OrderStatus::Confirmed => "Подтверждён",
            OrderStatus::Ready => "Готов к выдаче",
            OrderStatus::Completed => "Выдан",
            OrderStatus::Cancelled => "Отменён",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "ready" => Ok(OrderStatus::Ready),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Line item stored on the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    pub unit: String,
}

/// Order from database
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub producer_id: Uuid,
    pub point_id: Uuid,
    pub code: String,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub items: Json<Vec<OrderItem>>,
    pub customer_name: String,
    pub customer_phone: String,
    pub pickup_time: Option<DateTime<Utc>>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}
