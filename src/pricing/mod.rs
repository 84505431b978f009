//! Pricing engine module.
//!
//! Decides the unit price a customer is charged right now: the discount price
//! when it is a real reduction and its window is active, the regular price
//! otherwise.

pub mod calculators;
pub mod models;
pub mod requests;
pub mod responses;
pub mod services;

// Re-export commonly used items
pub use calculators::{discount_percentage, round_money, PricingResolver};
pub use models::{PriceFields, PriceQuote};
pub use services::{quote_offer, quote_product, Offer};
