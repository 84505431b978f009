//! Weekly work-hours model.
//!
//! Stored as JSON on the pickup point row:
//! `{"mon":[{"open":"09:00","close":"18:00"}],"sat":[]}`.
//! Missing or empty days are closed all day.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::ScheduleError;

/// Weekday key as stored in the schedule JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayKey {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayKey {
    pub const ALL: [DayKey; 7] = [
        DayKey::Mon,
        DayKey::Tue,
        DayKey::Wed,
        DayKey::Thu,
        DayKey::Fri,
        DayKey::Sat,
        DayKey::Sun,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DayKey::Mon => "mon",
            DayKey::Tue => "tue",
            DayKey::Wed => "wed",
            DayKey::Thu => "thu",
            DayKey::Fri => "fri",
            DayKey::Sat => "sat",
            DayKey::Sun => "sun",
        }
    }
}

impl From<Weekday> for DayKey {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayKey::Mon,
            Weekday::Tue => DayKey::Tue,
            Weekday::Wed => DayKey::Wed,
            Weekday::Thu => DayKey::Thu,
            Weekday::Fri => DayKey::Fri,
            Weekday::Sat => DayKey::Sat,
            Weekday::Sun => DayKey::Sun,
        }
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `HH:MM` (or `HH:MM:SS`) serde adapter for `NaiveTime`
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_clock(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parse a wall-clock time in `HH:MM` or `HH:MM:SS` form
pub fn parse_clock(raw: &str) -> Result<NaiveTime, ScheduleError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| ScheduleError::MalformedTime(raw.to_string()))
}

/// A single opening interval within a day, `[open, close)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
}

impl TimeRange {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// Build from `HH:MM` strings
    pub fn parse(open: &str, close: &str) -> Result<Self, ScheduleError> {
        Ok(Self::new(parse_clock(open)?, parse_clock(close)?))
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.open <= time && time < self.close
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.open < other.close && other.open < self.close
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.open.format("%H:%M"), self.close.format("%H:%M"))
    }
}

/// Day-keyed opening hours of a pickup point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklySchedule {
    days: BTreeMap<DayKey, Vec<TimeRange>>,
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style day assignment (unvalidated)
    pub fn with_day(mut self, day: DayKey, ranges: Vec<TimeRange>) -> Self {
        self.days.insert(day, ranges);
        self
    }

    /// Ranges for a day in declaration order; empty when closed
    pub fn day(&self, day: DayKey) -> &[TimeRange] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_closed_all_week(&self) -> bool {
        self.days.values().all(Vec::is_empty)
    }

    /// Decode the stored JSON column. Stored schedules were validated on write.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ScheduleError> {
        serde_json::from_value(value.clone())
            .map_err(|e| ScheduleError::MalformedSchedule(e.to_string()))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub(crate) fn days_mut(&mut self) -> &mut BTreeMap<DayKey, Vec<TimeRange>> {
        &mut self.days
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&DayKey, &Vec<TimeRange>)> {
        self.days.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_json_shape() {
        let schedule = WeeklySchedule::new().with_day(
            DayKey::Mon,
            vec![TimeRange::parse("09:00", "18:00").unwrap()],
        );
        let json = schedule.to_json();
        assert_eq!(json, serde_json::json!({"mon": [{"open": "09:00", "close": "18:00"}]}));

        let back = WeeklySchedule::from_json(&json).unwrap();
        assert_eq!(back, schedule);
    }

    #[test]
    fn test_schedule_accepts_seconds() {
        let json = serde_json::json!({"tue": [{"open": "08:30:00", "close": "12:00:00"}]});
        let schedule = WeeklySchedule::from_json(&json).unwrap();
        assert_eq!(schedule.day(DayKey::Tue)[0], TimeRange::parse("08:30", "12:00").unwrap());
    }

    #[test]
    fn test_missing_day_is_closed() {
        let schedule = WeeklySchedule::from_json(&serde_json::json!({})).unwrap();
        assert!(schedule.day(DayKey::Sun).is_empty());
        assert!(schedule.is_closed_all_week());
    }

    #[test]
    fn test_malformed_time_rejected() {
        let json = serde_json::json!({"mon": [{"open": "9am", "close": "18:00"}]});
        assert!(WeeklySchedule::from_json(&json).is_err());
        assert!(matches!(parse_clock("25:00"), Err(ScheduleError::MalformedTime(_))));
    }

    #[test]
    fn test_range_is_half_open() {
        let range = TimeRange::parse("09:00", "18:00").unwrap();
        assert!(range.contains(parse_clock("09:00").unwrap()));
        assert!(range.contains(parse_clock("17:59").unwrap()));
        assert!(!range.contains(parse_clock("18:00").unwrap()));
    }
}
