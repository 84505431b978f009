//! Work-hours and discount-window evaluation.
//!
//! Every decision here is made in a single business timezone configured once
//! for the whole service, never the caller's local clock.

pub mod evaluator;
pub mod models;
pub mod validation;
pub mod window;

use chrono_tz::Tz;

pub use evaluator::{evaluate_day, OpenState, PointStatus, ScheduleEvaluator};
pub use models::{parse_clock, DayKey, TimeRange, WeeklySchedule};
pub use validation::validate_schedule;
pub use window::{DailyBounds, DiscountEvaluator, DiscountPhase, DiscountWindow, Period};

/// Business timezone used when none is configured
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Chisinau;

/// Default opening-soon / closing-soon horizon in minutes
pub const DEFAULT_LEAD_MINUTES: i64 = 30;

/// Schedule and window configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Malformed time '{0}', expected HH:MM")]
    MalformedTime(String),

    #[error("Malformed schedule: {0}")]
    MalformedSchedule(String),

    #[error("{day}: range {range} must open before it closes (ranges crossing midnight are not supported)")]
    InvalidRange { day: DayKey, range: TimeRange },

    #[error("{day}: ranges {first} and {second} overlap")]
    Overlap {
        day: DayKey,
        first: TimeRange,
        second: TimeRange,
    },

    #[error("Discount window must start before it ends: {0}")]
    InvalidWindow(String),
}
