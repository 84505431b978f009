//! Discount pickup marketplace service.
//!
//! Decides whether a pickup point is open, whether a discount is in effect,
//! how much of a product can be bought at a point, and issues the short codes
//! customers present at pickup.

pub mod cache;
pub mod cart;
pub mod config;
pub mod db;
pub mod error;
pub mod geocode;
pub mod inventory;
pub mod models;
pub mod orders;
pub mod pricing;
pub mod routes;
pub mod schedule;

use sqlx::PgPool;

use crate::cache::AppCache;
use crate::config::AppConfig;
use crate::geocode::Geocoder;
use crate::inventory::StockFeed;
use crate::orders::{CodePolicy, Notifier};
use crate::pricing::PricingResolver;
use crate::schedule::{DiscountEvaluator, ScheduleEvaluator};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: AppCache,
    pub feed: StockFeed,
    pub notifier: Notifier,
    pub geocoder: Geocoder,
    pub schedule: ScheduleEvaluator,
    pub pricing: PricingResolver,
    pub code_policy: CodePolicy,
    pub deduction_retries: u32,
}

impl AppState {
    pub fn new(db: PgPool, config: &AppConfig) -> Self {
        Self {
            db,
            cache: AppCache::new(),
            feed: StockFeed::default(),
            notifier: Notifier::new(
                config.notify_webhook_url.clone(),
                config.notify_chat_id.clone(),
            ),
            geocoder: Geocoder::new(config.geocoder_url.clone(), config.geocoder_min_interval),
            schedule: ScheduleEvaluator::new(config.timezone, config.status_lead),
            pricing: PricingResolver::new(DiscountEvaluator::new(
                config.timezone,
                config.discount_lead,
            )),
            code_policy: config.code_policy,
            deduction_retries: config.deduction_retries,
        }
    }
}
