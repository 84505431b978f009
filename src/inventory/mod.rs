//! Point inventory: stock resolution, atomic deduction and the change feed.

pub mod feed;
pub mod models;
pub mod queries;
pub mod resolver;
pub mod services;

pub use feed::{FeedEvent, StockFeed, StockSubscription};
pub use models::{DeductionLine, StockChange, StockLevel, StockSource};
pub use resolver::resolve_stock;
pub use services::{read_stock, retry_transient, Transient};

/// Failure of an atomic stock deduction
#[derive(Debug, thiserror::Error)]
pub enum DeductionError {
    /// Stock changed underneath the checkout
    #[error("Insufficient stock for product {product_id}")]
    InsufficientStock { product_id: uuid::Uuid },

    /// A concurrent checkout created the point row first
    #[error("Concurrent update on product {product_id}")]
    Contended { product_id: uuid::Uuid },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Transient for DeductionError {
    fn is_transient(&self) -> bool {
        match self {
            DeductionError::InsufficientStock { .. } => false,
            DeductionError::Contended { .. } => true,
            DeductionError::Database(e) => match e {
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
                // serialization_failure, deadlock_detected, unique_violation
                sqlx::Error::Database(db) => matches!(
                    db.code().as_deref(),
                    Some("40001") | Some("40P01") | Some("23505")
                ),
                _ => false,
            },
        }
    }
}
