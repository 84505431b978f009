//! Pickup point open/closed evaluation.
//!
//! Pure functions over a schedule and an instant: no clock reads, no state.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::models::{DayKey, TimeRange, WeeklySchedule};

/// Coarse state shown on a pickup point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenState {
    Open,
    Closed,
    OpeningSoon,
    ClosingSoon,
}

impl OpenState {
    pub fn is_open(self) -> bool {
        matches!(self, OpenState::Open | OpenState::ClosingSoon)
    }
}

/// Evaluated status of a pickup point at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointStatus {
    pub state: OpenState,
    /// End of the current range when open
    pub until: Option<NaiveTime>,
    /// Next same-day opening when not open
    pub from: Option<NaiveTime>,
}

impl PointStatus {
    fn open(state: OpenState, until: NaiveTime) -> Self {
        Self {
            state,
            until: Some(until),
            from: None,
        }
    }

    fn closed(state: OpenState, from: Option<NaiveTime>) -> Self {
        Self {
            state,
            until: None,
            from,
        }
    }

    /// Plain "closed", used when no schedule can be read
    pub fn closed_today() -> Self {
        Self::closed(OpenState::Closed, None)
    }

    /// Customer-facing status line
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.state, self.until, self.from) {
            (OpenState::Open | OpenState::ClosingSoon, Some(until), _) => {
                write!(f, "Открыто до {}", until.format("%H:%M"))
            }
            (OpenState::OpeningSoon, _, Some(from)) => {
                write!(f, "Откроется в {}", from.format("%H:%M"))
            }
            (OpenState::Closed, _, Some(from)) => {
                write!(f, "Закрыто, откроется в {}", from.format("%H:%M"))
            }
            _ => f.write_str("Закрыто"),
        }
    }
}

/// Evaluate one day's ranges at a wall-clock time.
///
/// Ranges are checked in declaration order; the first containing `now` wins and
/// becomes `ClosingSoon` when its close is within `lead`. Otherwise the earliest
/// later range decides between `OpeningSoon` and `Closed`. A zero `lead`
/// disables the soon states.
pub fn evaluate_day(ranges: &[TimeRange], now: NaiveTime, lead: Duration) -> PointStatus {
    if let Some(current) = ranges.iter().find(|r| r.contains(now)) {
        let remaining = current.close - now;
        let state = if remaining <= lead {
            OpenState::ClosingSoon
        } else {
            OpenState::Open
        };
        return PointStatus::open(state, current.close);
    }

    let next_open = ranges.iter().map(|r| r.open).filter(|open| *open > now).min();

    match next_open {
        Some(open) if open - now <= lead => PointStatus::closed(OpenState::OpeningSoon, Some(open)),
        Some(open) => PointStatus::closed(OpenState::Closed, Some(open)),
        None => PointStatus::closed(OpenState::Closed, None),
    }
}

/// Schedule evaluator bound to the business timezone
#[derive(Debug, Clone, Copy)]
pub struct ScheduleEvaluator {
    tz: Tz,
    lead: Duration,
}

impl ScheduleEvaluator {
    pub fn new(tz: Tz, lead: Duration) -> Self {
        Self { tz, lead }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn lead(&self) -> Duration {
        self.lead
    }

    /// Status of a weekly schedule at an absolute instant
    pub fn status(&self, schedule: &WeeklySchedule, now: DateTime<Utc>) -> PointStatus {
        let local = now.with_timezone(&self.tz);
        let day = DayKey::from(local.weekday());
        evaluate_day(schedule.day(day), local.time(), self.lead)
    }
}

impl Default for ScheduleEvaluator {
    fn default() -> Self {
        Self::new(
            super::DEFAULT_TIMEZONE,
            Duration::minutes(super::DEFAULT_LEAD_MINUTES),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(raw: &str) -> NaiveTime {
        super::super::parse_clock(raw).unwrap()
    }

    fn range(open: &str, close: &str) -> TimeRange {
        TimeRange::parse(open, close).unwrap()
    }

    fn lead() -> Duration {
        Duration::minutes(30)
    }

    /// Monday 2024-05-13 at the given local time in Chisinau
    fn monday_at(h: u32, m: u32) -> DateTime<Utc> {
        chrono_tz::Europe::Chisinau
            .with_ymd_and_hms(2024, 5, 13, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_closing_soon_scenario() {
        let schedule = WeeklySchedule::new().with_day(DayKey::Mon, vec![range("09:00", "18:00")]);
        let status = ScheduleEvaluator::default().status(&schedule, monday_at(17, 45));
        assert_eq!(status.state, OpenState::ClosingSoon);
        assert_eq!(status.message(), "Открыто до 18:00");
    }

    #[test]
    fn test_open_inside_range() {
        let status = evaluate_day(&[range("09:00", "18:00")], t("12:00"), lead());
        assert_eq!(status.state, OpenState::Open);
        assert_eq!(status.until, Some(t("18:00")));
        assert_eq!(status.message(), "Открыто до 18:00");
    }

    #[test]
    fn test_closing_soon_boundary() {
        let ranges = [range("09:00", "18:00")];
        assert_eq!(evaluate_day(&ranges, t("17:29"), lead()).state, OpenState::Open);
        assert_eq!(evaluate_day(&ranges, t("17:30"), lead()).state, OpenState::ClosingSoon);
        assert_eq!(evaluate_day(&ranges, t("18:00"), lead()).state, OpenState::Closed);
    }

    #[test]
    fn test_opening_soon() {
        let status = evaluate_day(&[range("09:00", "18:00")], t("08:40"), lead());
        assert_eq!(status.state, OpenState::OpeningSoon);
        assert_eq!(status.message(), "Откроется в 09:00");
    }

    #[test]
    fn test_closed_names_next_opening() {
        let ranges = [range("09:00", "12:00"), range("15:00", "18:00")];
        let status = evaluate_day(&ranges, t("13:00"), lead());
        assert_eq!(status.state, OpenState::Closed);
        assert_eq!(status.from, Some(t("15:00")));
        assert_eq!(status.message(), "Закрыто, откроется в 15:00");
    }

    #[test]
    fn test_closed_after_last_range() {
        let status = evaluate_day(&[range("09:00", "18:00")], t("20:00"), lead());
        assert_eq!(status.state, OpenState::Closed);
        assert_eq!(status.from, None);
        assert_eq!(status.message(), "Закрыто");
    }

    #[test]
    fn test_empty_day_always_closed() {
        for raw in ["00:00", "09:00", "23:59"] {
            let status = evaluate_day(&[], t(raw), lead());
            assert_eq!(status.state, OpenState::Closed);
            assert_eq!(status.message(), "Закрыто");
        }
    }

    #[test]
    fn test_zero_lead_disables_soon_states() {
        let ranges = [range("09:00", "18:00")];
        assert_eq!(evaluate_day(&ranges, t("17:59"), Duration::zero()).state, OpenState::Open);
        assert_eq!(evaluate_day(&ranges, t("08:59"), Duration::zero()).state, OpenState::Closed);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let schedule = WeeklySchedule::new().with_day(DayKey::Mon, vec![range("09:00", "18:00")]);
        let evaluator = ScheduleEvaluator::default();
        let now = monday_at(10, 15);
        assert_eq!(evaluator.status(&schedule, now), evaluator.status(&schedule, now));
    }

    #[test]
    fn test_uses_business_timezone_not_utc() {
        // 06:30 UTC on Monday is 09:30 in Chisinau (summer time, UTC+3)
        let schedule = WeeklySchedule::new().with_day(DayKey::Mon, vec![range("09:00", "18:00")]);
        let now = Utc.with_ymd_and_hms(2024, 5, 13, 6, 30, 0).unwrap();
        let status = ScheduleEvaluator::default().status(&schedule, now);
        assert_eq!(status.state, OpenState::Open);
    }

    #[test]
    fn test_weekday_taken_from_local_date() {
        // Sunday 22:30 UTC is already Monday 01:30 in Chisinau
        let schedule = WeeklySchedule::new().with_day(DayKey::Mon, vec![range("01:00", "02:00")]);
        let now = Utc.with_ymd_and_hms(2024, 5, 12, 22, 30, 0).unwrap();
        let status = ScheduleEvaluator::default().status(&schedule, now);
        assert!(status.state.is_open());
    }
}
