//! Calendar-day keys.
//!
//! Timestamps are converted to a [`DayKey`] exactly once, at the boundary,
//! in the calendar timezone of the device. All streak arithmetic works on
//! these keys.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A local calendar day (`YYYY-MM-DD`), ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// The calendar day `instant` falls on in its own timezone.
    pub fn from_instant<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self(instant.date_naive())
    }

    /// Parse an RFC 3339 timestamp and key it in `tz`.
    pub fn from_rfc3339<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|at| Self::from_instant(&at.with_timezone(tz)))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The day before. Saturates at the earliest representable date.
    pub fn pred(&self) -> Self {
        Self(self.0.pred_opt().unwrap_or(self.0))
    }

    /// The day after. Saturates at the latest representable date.
    pub fn succ(&self) -> Self {
        Self(self.0.succ_opt().unwrap_or(self.0))
    }

    /// Signed number of calendar days from `self` to `other`.
    pub fn days_until(&self, other: DayKey) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// True when `self` is exactly one calendar day before `other`.
    pub fn is_day_before(&self, other: DayKey) -> bool {
        self.days_until(other) == 1
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl FromStr for DayKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map(Self)
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn day(s: &str) -> DayKey {
        s.parse().unwrap()
    }

    #[test]
    fn month_and_year_boundaries() {
        assert!(day("2024-02-29").is_day_before(day("2024-03-01")));
        assert!(day("2023-12-31").is_day_before(day("2024-01-01")));
        assert_eq!(day("2024-03-01").pred(), day("2024-02-29"));
        assert!(!day("2024-03-01").is_day_before(day("2024-03-03")));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let key = DayKey::from_ymd(2024, 7, 4).unwrap();
        assert_eq!(key.to_string(), "2024-07-04");
        assert_eq!(day("2024-07-04"), key);
    }

    #[test]
    fn keys_follow_local_calendar_not_utc() {
        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
        let raw = "2024-01-02T03:00:00Z";
        assert_eq!(DayKey::from_rfc3339(raw, &Utc), Some(day("2024-01-02")));
        assert_eq!(
            DayKey::from_rfc3339(raw, &new_york),
            Some(day("2024-01-01"))
        );
        assert_eq!(DayKey::from_rfc3339("not a time", &Utc), None);
    }

    #[test]
    fn serde_as_plain_string() {
        let json = serde_json::to_string(&day("2024-09-30")).unwrap();
        assert_eq!(json, "\"2024-09-30\"");
        let back: DayKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, day("2024-09-30"));
    }
}
