//! Pickup point model

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::schedule::{DiscountWindow, ScheduleError, WeeklySchedule};

/// Pickup point from database
#[derive(Debug, Clone, FromRow)]
pub struct PickupPoint {
    pub id: Uuid,
    pub producer_id: Uuid,
    pub name: String,
    pub address: String,
    pub work_hours: serde_json::Value,
    pub discount_start: Option<NaiveTime>,
    pub discount_end: Option<NaiveTime>,
    pub is_active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Latitude / longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl PickupPoint {
    /// Decode the stored work-hours JSON
    pub fn schedule(&self) -> Result<WeeklySchedule, ScheduleError> {
        WeeklySchedule::from_json(&self.work_hours)
    }

    /// Daily discount hours of this point, if configured
    pub fn discount_window(&self) -> Result<Option<DiscountWindow>, ScheduleError> {
        DiscountWindow::from_point_bounds(self.discount_start, self.discount_end)
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }
}
