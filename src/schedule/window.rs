//! Discount windows.
//!
//! The canonical window is a pair of optional constraints, both of which must
//! hold for the discount to be in effect:
//!
//! - `daily`: repeating `[start, end)` bounds in business-local wall-clock time
//! - `period`: an absolute `[from, to)` span, either end open
//!
//! Pickup points store daily bounds; older per-product rows store absolute
//! timestamps. Both are adapted into [`DiscountWindow`] at the read boundary.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::ScheduleError;

/// Repeating daily discount hours, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDailyBounds")]
pub struct DailyBounds {
    start: NaiveTime,
    end: NaiveTime,
}

#[derive(Deserialize)]
struct RawDailyBounds {
    start: NaiveTime,
    end: NaiveTime,
}

impl TryFrom<RawDailyBounds> for DailyBounds {
    type Error = ScheduleError;

    fn try_from(raw: RawDailyBounds) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DailyBounds {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ScheduleError> {
        if start >= end {
            return Err(ScheduleError::InvalidWindow(format!(
                "{} - {}",
                start.format("%H:%M:%S"),
                end.format("%H:%M:%S")
            )));
        }
        Ok(Self { start, end })
    }

    /// Build from `HH:MM:SS` (or `HH:MM`) strings
    pub fn parse(start: &str, end: &str) -> Result<Self, ScheduleError> {
        Self::new(super::parse_clock(start)?, super::parse_clock(end)?)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }
}

/// Absolute validity span, `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl Period {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| from <= instant) && self.to.map_or(true, |to| instant < to)
    }
}

/// Canonical discount window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscountWindow {
    pub daily: Option<DailyBounds>,
    pub period: Option<Period>,
}

impl DiscountWindow {
    /// No constraint: the discount is always in effect
    pub fn always() -> Self {
        Self::default()
    }

    pub fn daily(bounds: DailyBounds) -> Self {
        Self {
            daily: Some(bounds),
            period: None,
        }
    }

    /// Adapter for the per-point `discount_start` / `discount_end` TIME columns.
    ///
    /// Both unset means no window. Only one set is a configuration error.
    pub fn from_point_bounds(
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
    ) -> Result<Option<Self>, ScheduleError> {
        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Ok(Some(Self::daily(DailyBounds::new(start, end)?))),
            (start, end) => Err(ScheduleError::InvalidWindow(format!(
                "incomplete daily bounds {:?} - {:?}",
                start, end
            ))),
        }
    }

    /// Adapter for legacy per-product absolute timestamps.
    ///
    /// Either end may be open; both unset means no window.
    pub fn from_legacy_timestamps(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>, ScheduleError> {
        if let (Some(from), Some(to)) = (start, end) {
            if from >= to {
                return Err(ScheduleError::InvalidWindow(format!("{} - {}", from, to)));
            }
        }
        if start.is_none() && end.is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            daily: None,
            period: Some(Period {
                from: start,
                to: end,
            }),
        }))
    }

    /// Whether the window holds at an instant
    pub fn is_active_at(&self, instant: DateTime<Utc>, tz: Tz) -> bool {
        let in_period = self.period.map_or(true, |p| p.contains(instant));
        let in_daily = self
            .daily
            .map_or(true, |d| d.contains(instant.with_timezone(&tz).time()));
        in_period && in_daily
    }

    /// Instants at which the window may switch on, used for lookahead
    fn start_candidates(&self, now: DateTime<Utc>, tz: Tz) -> Vec<DateTime<Utc>> {
        self.candidates(
            self.period.and_then(|p| p.from),
            self.daily.map(|d| d.start),
            now,
            tz,
        )
    }

    /// Instants at which the window may switch off
    fn end_candidates(&self, now: DateTime<Utc>, tz: Tz) -> Vec<DateTime<Utc>> {
        self.candidates(
            self.period.and_then(|p| p.to),
            self.daily.map(|d| d.end),
            now,
            tz,
        )
    }

    fn candidates(
        &self,
        absolute: Option<DateTime<Utc>>,
        daily: Option<NaiveTime>,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Vec<DateTime<Utc>> {
        let mut candidates = Vec::with_capacity(3);
        candidates.extend(absolute);
        if let Some(time) = daily {
            let today = now.with_timezone(&tz).date_naive();
            for date in [Some(today), today.succ_opt()].into_iter().flatten() {
                if let Some(local) = tz.from_local_datetime(&date.and_time(time)).earliest() {
                    candidates.push(local.with_timezone(&Utc));
                }
            }
        }
        candidates
    }
}

/// Discount state with optional lead/lag nuance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountPhase {
    Active,
    /// Active, but switching off within the lead
    EndingSoon,
    /// Inactive, but switching on within the lead
    StartingSoon,
    Inactive,
}

impl DiscountPhase {
    pub fn is_active(self) -> bool {
        matches!(self, DiscountPhase::Active | DiscountPhase::EndingSoon)
    }
}

/// Discount window evaluator bound to the business timezone
#[derive(Debug, Clone, Copy)]
pub struct DiscountEvaluator {
    tz: Tz,
    lead: Duration,
}

impl DiscountEvaluator {
    /// `lead` of zero yields only `Active` / `Inactive`
    pub fn new(tz: Tz, lead: Duration) -> Self {
        Self { tz, lead }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Phase of an optional window; no window means always active
    pub fn phase(&self, window: Option<&DiscountWindow>, now: DateTime<Utc>) -> DiscountPhase {
        let Some(window) = window else {
            return DiscountPhase::Active;
        };

        let active = window.is_active_at(now, self.tz);
        if self.lead <= Duration::zero() {
            return if active {
                DiscountPhase::Active
            } else {
                DiscountPhase::Inactive
            };
        }

        let horizon = now + self.lead;
        if active {
            // The window may switch off and on again before the horizon
            let ends_soon = !window.is_active_at(horizon, self.tz)
                || window
                    .end_candidates(now, self.tz)
                    .into_iter()
                    .filter(|e| *e > now && *e <= horizon)
                    .any(|e| !window.is_active_at(e, self.tz));
            if ends_soon {
                DiscountPhase::EndingSoon
            } else {
                DiscountPhase::Active
            }
        } else {
            let starts_soon = window
                .start_candidates(now, self.tz)
                .into_iter()
                .filter(|s| *s > now && *s <= horizon)
                .any(|s| window.is_active_at(s, self.tz));
            if starts_soon {
                DiscountPhase::StartingSoon
            } else {
                DiscountPhase::Inactive
            }
        }
    }

    pub fn is_active(&self, window: Option<&DiscountWindow>, now: DateTime<Utc>) -> bool {
        self.phase(window, now).is_active()
    }
}

impl Default for DiscountEvaluator {
    fn default() -> Self {
        Self::new(super::DEFAULT_TIMEZONE, Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chisinau(h: u32, m: u32) -> DateTime<Utc> {
        chrono_tz::Europe::Chisinau
            .with_ymd_and_hms(2024, 5, 13, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn evening() -> DiscountWindow {
        DiscountWindow::daily(DailyBounds::parse("18:00:00", "21:00:00").unwrap())
    }

    #[test]
    fn test_daily_window_active_inside_bounds() {
        let eval = DiscountEvaluator::default();
        assert!(eval.is_active(Some(&evening()), chisinau(19, 0)));
        assert!(eval.is_active(Some(&evening()), chisinau(18, 0)));
        assert!(!eval.is_active(Some(&evening()), chisinau(21, 0)));
        assert!(!eval.is_active(Some(&evening()), chisinau(12, 0)));
    }

    #[test]
    fn test_no_window_is_always_active() {
        let eval = DiscountEvaluator::default();
        assert_eq!(eval.phase(None, chisinau(3, 0)), DiscountPhase::Active);
        assert!(eval.is_active(Some(&DiscountWindow::always()), chisinau(3, 0)));
    }

    #[test]
    fn test_zero_lead_has_no_soon_phases() {
        let eval = DiscountEvaluator::default();
        assert_eq!(eval.phase(Some(&evening()), chisinau(17, 55)), DiscountPhase::Inactive);
        assert_eq!(eval.phase(Some(&evening()), chisinau(20, 55)), DiscountPhase::Active);
    }

    #[test]
    fn test_lead_reports_soon_phases() {
        let eval = DiscountEvaluator::new(chrono_tz::Europe::Chisinau, Duration::minutes(30));
        assert_eq!(eval.phase(Some(&evening()), chisinau(17, 40)), DiscountPhase::StartingSoon);
        assert_eq!(eval.phase(Some(&evening()), chisinau(17, 0)), DiscountPhase::Inactive);
        assert_eq!(eval.phase(Some(&evening()), chisinau(20, 40)), DiscountPhase::EndingSoon);
        assert_eq!(eval.phase(Some(&evening()), chisinau(19, 0)), DiscountPhase::Active);
        assert!(DiscountPhase::EndingSoon.is_active());
        assert!(!DiscountPhase::StartingSoon.is_active());
    }

    #[test]
    fn test_lead_spanning_next_start_still_ends_soon() {
        let eval = DiscountEvaluator::new(chrono_tz::Europe::Chisinau, Duration::hours(24));
        // 20:50 + 24h lands inside tomorrow's window
        assert_eq!(eval.phase(Some(&evening()), chisinau(20, 50)), DiscountPhase::EndingSoon);
    }

    #[test]
    fn test_daily_bounds_deserialize_validates() {
        let bounds: DailyBounds =
            serde_json::from_str(r#"{"start": "18:00:00", "end": "21:00:00"}"#).unwrap();
        assert_eq!(bounds, DailyBounds::parse("18:00", "21:00").unwrap());

        assert!(serde_json::from_str::<DailyBounds>(r#"{"start": "21:00:00", "end": "18:00:00"}"#)
            .is_err());
        assert!(serde_json::from_str::<DiscountWindow>(
            r#"{"daily": {"start": "18:00:00", "end": "18:00:00"}, "period": null}"#
        )
        .is_err());
    }

    #[test]
    fn test_short_window_within_lead_is_starting_soon() {
        let eval = DiscountEvaluator::new(chrono_tz::Europe::Chisinau, Duration::minutes(30));
        let window = DiscountWindow::daily(DailyBounds::parse("18:00", "18:10").unwrap());
        assert_eq!(eval.phase(Some(&window), chisinau(17, 55)), DiscountPhase::StartingSoon);
    }

    #[test]
    fn test_legacy_timestamps_adapter() {
        let window = DiscountWindow::from_legacy_timestamps(
            Some(chisinau(10, 0)),
            Some(chisinau(14, 0)),
        )
        .unwrap()
        .unwrap();
        let eval = DiscountEvaluator::default();
        assert!(eval.is_active(Some(&window), chisinau(12, 0)));
        assert!(!eval.is_active(Some(&window), chisinau(14, 0)));
        assert!(!eval.is_active(Some(&window), chisinau(9, 59)));
    }

    #[test]
    fn test_legacy_open_ended_period() {
        let window = DiscountWindow::from_legacy_timestamps(Some(chisinau(10, 0)), None)
            .unwrap()
            .unwrap();
        assert!(DiscountEvaluator::default().is_active(Some(&window), chisinau(23, 0)));
    }

    #[test]
    fn test_legacy_inverted_timestamps_rejected() {
        let result =
            DiscountWindow::from_legacy_timestamps(Some(chisinau(14, 0)), Some(chisinau(10, 0)));
        assert!(matches!(result, Err(ScheduleError::InvalidWindow(_))));
        assert_eq!(DiscountWindow::from_legacy_timestamps(None, None), Ok(None));
    }

    #[test]
    fn test_point_bounds_adapter() {
        let start = NaiveTime::from_hms_opt(18, 0, 0);
        let end = NaiveTime::from_hms_opt(21, 0, 0);
        assert_eq!(
            DiscountWindow::from_point_bounds(start, end).unwrap(),
            Some(evening())
        );
        assert_eq!(DiscountWindow::from_point_bounds(None, None), Ok(None));
        assert!(DiscountWindow::from_point_bounds(start, None).is_err());
        assert!(DiscountWindow::from_point_bounds(end, start).is_err());
    }

    #[test]
    fn test_daily_and_period_combine() {
        let window = DiscountWindow {
            daily: Some(DailyBounds::parse("18:00", "21:00").unwrap()),
            period: Some(Period {
                from: None,
                to: Some(chisinau(19, 0)),
            }),
        };
        let eval = DiscountEvaluator::default();
        assert!(eval.is_active(Some(&window), chisinau(18, 30)));
        assert!(!eval.is_active(Some(&window), chisinau(19, 30)));
    }
}
