//! Bot-style webhook notifications for new orders and status changes.
//!
//! Delivery is best-effort: failures are logged and never block the order flow.

use std::fmt::Write as _;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Serialize;

use super::models::{OrderRow, OrderStatus};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook rejected message with status {0}")]
    Rejected(reqwest::StatusCode),
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Webhook client; disabled when no URL is configured
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
    chat_id: String,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>, chat_id: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            webhook_url,
            chat_id: chat_id.unwrap_or_default(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Send one message and wait for the result
    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&WebhookMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status()));
        }
        Ok(())
    }

    /// Fire-and-forget delivery on the runtime
    pub fn notify(&self, text: String) {
        if !self.is_enabled() {
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&text).await {
                tracing::warn!("Order notification failed: {}", e);
            }
        });
    }
}

/// Summary posted when an order is placed
pub fn format_new_order(order: &OrderRow, point_name: &str, tz: Tz) -> String {
    let mut text = format!("Новый заказ #{}\nТочка: {}\n", order.code, point_name);
    for item in order.items.iter() {
        let _ = writeln!(
            text,
            "• {} × {} {} по {}",
            item.name, item.quantity, item.unit, item.unit_price
        );
    }
    let _ = write!(
        text,
        "Итого: {}\nКлиент: {}, {}",
        order.total, order.customer_name, order.customer_phone
    );
    if let Some(pickup) = order.pickup_time {
        let _ = write!(
            text,
            "\nВыдача: {}",
            pickup.with_timezone(&tz).format("%d.%m %H:%M")
        );
    }
    text
}

/// Message posted when an order changes status
pub fn format_status_change(order: &OrderRow, previous: OrderStatus) -> String {
    format!(
        "Заказ #{}: {} → {}",
        order.code,
        previous.label(),
        order.status.label()
    )
}
