//! Request DTOs for pricing API endpoints.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Query string for offer lookups
#[derive(Debug, Default, Deserialize)]
pub struct OfferQuery {
    /// Evaluate at this instant instead of now
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}
