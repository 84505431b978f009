//! In-process stock change feed.
//!
//! Committed deductions, restorations and producer edits are published on a
//! broadcast channel. Views subscribe per pickup point (optionally narrowed to a
//! product set) and hold a [`StockSubscription`]; dropping the handle
//! deregisters it. Delivery is best-effort: a lagging subscriber gets a
//! [`FeedEvent::Resync`] and must re-read stock.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::models::StockChange;

/// Default channel capacity
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// Event delivered to a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEvent {
    Changed(StockChange),
    /// Updates were missed; the subscriber should re-read current stock
    Resync,
}

/// What travels on the channel
#[derive(Debug, Clone, Copy)]
enum Message {
    Change(StockChange),
    /// Bulk rewrite of a point's stock, or of every point when `None`
    Resync(Option<Uuid>),
}

/// Broadcast bus for stock changes
#[derive(Debug, Clone)]
pub struct StockFeed {
    tx: broadcast::Sender<Message>,
    /// Active subscriptions per pickup point
    subscribers: Arc<DashMap<Uuid, usize>>,
}

impl StockFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            subscribers: Arc::new(DashMap::new()),
        }
    }

    /// Publish a change; returns how many receivers saw it
    pub fn publish(&self, change: StockChange) -> usize {
        match self.tx.send(Message::Change(change)) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!("No stock subscribers for point {}", change.point_id);
                0
            }
        }
    }

    pub fn publish_all(&self, changes: &[StockChange]) {
        for change in changes {
            self.publish(*change);
        }
    }

    /// Tell subscribers of a point (or of all points) to re-read stock
    pub fn publish_resync(&self, point_id: Option<Uuid>) -> usize {
        self.tx.send(Message::Resync(point_id)).unwrap_or(0)
    }

    /// Subscribe to a point; an empty product set means every product
    pub fn subscribe(
        &self,
        point_id: Uuid,
        product_ids: impl IntoIterator<Item = Uuid>,
    ) -> StockSubscription {
        *self.subscribers.entry(point_id).or_insert(0) += 1;
        tracing::debug!("Stock subscription opened for point {}", point_id);

        StockSubscription {
            point_id,
            products: product_ids.into_iter().collect(),
            rx: self.tx.subscribe(),
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self, point_id: Uuid) -> usize {
        self.subscribers.get(&point_id).map_or(0, |count| *count)
    }
}

impl Default for StockFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

/// Scoped subscription handle; deregisters on drop
#[derive(Debug)]
pub struct StockSubscription {
    point_id: Uuid,
    products: HashSet<Uuid>,
    rx: broadcast::Receiver<Message>,
    subscribers: Arc<DashMap<Uuid, usize>>,
}

impl StockSubscription {
    pub fn point_id(&self) -> Uuid {
        self.point_id
    }

    fn filter(&self, message: Message) -> Option<FeedEvent> {
        match message {
            Message::Change(change)
                if change.point_id == self.point_id
                    && (self.products.is_empty() || self.products.contains(&change.product_id)) =>
            {
                Some(FeedEvent::Changed(change))
            }
            Message::Resync(None) => Some(FeedEvent::Resync),
            Message::Resync(Some(point_id)) if point_id == self.point_id => Some(FeedEvent::Resync),
            _ => None,
        }
    }

    /// Wait for the next relevant event; `None` once the feed is gone
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(message) => {
                    if let Some(event) = self.filter(message) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Stock subscription for point {} lagged by {} messages",
                        self.point_id,
                        skipped
                    );
                    return Some(FeedEvent::Resync);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<FeedEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if let Some(event) = self.filter(message) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => return Some(FeedEvent::Resync),
                Err(_) => return None,
            }
        }
    }
}

impl Drop for StockSubscription {
    fn drop(&mut self) {
        if let Some(mut count) = self.subscribers.get_mut(&self.point_id) {
            *count = count.saturating_sub(1);
        }
        self.subscribers.remove_if(&self.point_id, |_, count| *count == 0);
        tracing::debug!("Stock subscription closed for point {}", self.point_id);
    }
}
