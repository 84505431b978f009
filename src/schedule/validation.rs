//! Write-time schedule validation.

use super::models::WeeklySchedule;
use super::ScheduleError;

/// Validate a schedule authored by a producer.
///
/// Rejects ranges that do not open before they close and ranges that overlap
/// within a day. On success returns the schedule with each day's ranges sorted
/// by opening time.
pub fn validate_schedule(schedule: &WeeklySchedule) -> Result<WeeklySchedule, ScheduleError> {
    let mut normalized = schedule.clone();

    for (day, ranges) in normalized.days_mut().iter_mut() {
        if let Some(bad) = ranges.iter().find(|r| r.open >= r.close) {
            return Err(ScheduleError::InvalidRange {
                day: *day,
                range: *bad,
            });
        }

        ranges.sort_by_key(|r| r.open);

        // Sorted by open, so only neighbours can overlap
        for pair in ranges.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(ScheduleError::Overlap {
                    day: *day,
                    first: pair[0],
                    second: pair[1],
                });
            }
        }
    }

    tracing::debug!(
        "Validated schedule with {} configured days",
        normalized.iter().filter(|(_, r)| !r.is_empty()).count()
    );

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{DayKey, TimeRange};

    fn range(open: &str, close: &str) -> TimeRange {
        TimeRange::parse(open, close).unwrap()
    }

    #[test]
    fn test_valid_schedule_is_sorted() {
        let schedule = WeeklySchedule::new().with_day(
            DayKey::Mon,
            vec![range("14:00", "18:00"), range("09:00", "12:00")],
        );
        let validated = validate_schedule(&schedule).unwrap();
        assert_eq!(
            validated.day(DayKey::Mon),
            &[range("09:00", "12:00"), range("14:00", "18:00")]
        );
    }

    #[test]
    fn test_touching_ranges_are_allowed() {
        let schedule = WeeklySchedule::new().with_day(
            DayKey::Fri,
            vec![range("09:00", "12:00"), range("12:00", "15:00")],
        );
        assert!(validate_schedule(&schedule).is_ok());
    }

    #[test]
    fn test_overlap_rejected() {
        let schedule = WeeklySchedule::new().with_day(
            DayKey::Wed,
            vec![range("09:00", "13:00"), range("12:00", "15:00")],
        );
        let err = validate_schedule(&schedule).unwrap_err();
        assert!(matches!(err, ScheduleError::Overlap { day: DayKey::Wed, .. }));
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_open_after_close_rejected() {
        let schedule =
            WeeklySchedule::new().with_day(DayKey::Sat, vec![range("18:00", "09:00")]);
        let err = validate_schedule(&schedule).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRange { day: DayKey::Sat, .. }));
    }

    #[test]
    fn test_midnight_crossing_rejected() {
        let schedule =
            WeeklySchedule::new().with_day(DayKey::Sat, vec![range("22:00", "00:00")]);
        assert!(validate_schedule(&schedule).is_err());
    }

    #[test]
    fn test_empty_range_rejected() {
        let schedule =
            WeeklySchedule::new().with_day(DayKey::Sun, vec![range("10:00", "10:00")]);
        assert!(validate_schedule(&schedule).is_err());
    }

    #[test]
    fn test_empty_days_are_valid() {
        let schedule = WeeklySchedule::new().with_day(DayKey::Sun, vec![]);
        assert!(validate_schedule(&schedule).is_ok());
    }
}
