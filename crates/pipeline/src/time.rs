//! Timestamp parsing and calendar-derived features

use crate::errors::{PipelineError, Result};
use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::{America::New_York, Tz};
use std::f64::consts::PI;
use taxiscore_reference::Month;

/// Format of `pickup_datetime` in trip requests, e.g. `07/04/2025 02:30:00 PM`.
pub const PICKUP_DATETIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Format of the hotspot `time` parameter, always UTC.
pub const HOTSPOT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn parse_pickup_datetime(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), PICKUP_DATETIME_FORMAT)
        .map_err(|_| PipelineError::InvalidDatetime(value.to_string()))
}

/// Month of a trip timestamp, used to pick the month's resources.
pub fn pickup_month(value: &str) -> Result<Month> {
    let dt = parse_pickup_datetime(value)?;
    Ok(Month::from_number(dt.month())?)
}

/// Resolve the hotspot prediction time in New York local time.
///
/// Without an explicit time, `now` truncated to the hour is used.
pub fn resolve_hotspot_time(time: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Tz>> {
    let utc = match time {
        Some(text) => {
            let naive = NaiveDateTime::parse_from_str(text, HOTSPOT_TIME_FORMAT)
                .map_err(|_| PipelineError::InvalidTime(text.to_string()))?;
            Utc.from_utc_datetime(&naive)
        }
        None => now
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now),
    };
    Ok(utc.with_timezone(&New_York))
}

/// Coarse part of the day used by the hotspot models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeOfDay {
    EarlyMorning,
    MorningRush,
    Midday,
    EveningRush,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=4 => TimeOfDay::EarlyMorning,
            5..=9 => TimeOfDay::MorningRush,
            10..=14 => TimeOfDay::Midday,
            15..=18 => TimeOfDay::EveningRush,
            _ => TimeOfDay::Night,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeOfDay::EarlyMorning => "Early Morning",
            TimeOfDay::MorningRush => "Morning Rush",
            TimeOfDay::Midday => "Midday",
            TimeOfDay::EveningRush => "Evening Rush",
            TimeOfDay::Night => "Night",
        }
    }

    /// Label with spaces replaced, for use inside column names.
    pub fn column_label(self) -> String {
        self.label().replace(' ', "_")
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Hour/day features shared by both pipelines. Days count from Monday = 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calendar {
    pub hour: u32,
    pub day_of_week: u32,
    pub is_weekend: bool,
}

impl Calendar {
    pub fn of<T: Datelike + Timelike>(time: &T) -> Self {
        let day_of_week = time.weekday().num_days_from_monday();
        Self {
            hour: time.hour(),
            day_of_week,
            is_weekend: day_of_week >= 5,
        }
    }

    /// `(sin, cos)` of the hour on a 24-hour circle.
    pub fn cyclic_hour(&self) -> (f64, f64) {
        let angle = 2.0 * PI * self.hour as f64 / 24.0;
        (angle.sin(), angle.cos())
    }

    pub fn weekend_flag(&self) -> u8 {
        u8::from(self.is_weekend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_pickup_datetime() {
        let dt = parse_pickup_datetime("07/04/2025 02:30:00 PM").unwrap();
        assert_eq!((dt.month(), dt.day(), dt.hour()), (7, 4, 14));
        assert_eq!(parse_pickup_datetime("7/4/2025 12:05:00 am").unwrap().hour(), 0);
        assert!(matches!(
            parse_pickup_datetime("2025-07-04 14:30"),
            Err(PipelineError::InvalidDatetime(_))
        ));
        assert_eq!(pickup_month("12/31/2024 11:59:59 PM").unwrap(), Month::December);
    }

    #[test]
    fn test_hotspot_time_converts_to_new_york() {
        let now = Utc::now();
        let t = resolve_hotspot_time(Some("2025-07-04T18:00:00Z"), now).unwrap();
        assert_eq!((t.month(), t.day(), t.hour()), (7, 4, 14));

        // Early UTC hours on the 1st still belong to the previous NYC month.
        let t = resolve_hotspot_time(Some("2025-03-01T02:00:00Z"), now).unwrap();
        assert_eq!((t.month(), t.day(), t.hour()), (2, 28, 21));

        assert!(matches!(
            resolve_hotspot_time(Some("2025-07-04 18:00"), now),
            Err(PipelineError::InvalidTime(_))
        ));
    }

    #[test]
    fn test_default_time_truncates_to_hour() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 17, 42, 9).unwrap();
        let t = resolve_hotspot_time(None, now).unwrap();
        assert_eq!((t.hour(), t.minute(), t.second()), (12, 0, 0));
    }

    #[test]
    fn test_time_of_day_buckets() {
        let codes: Vec<u32> = (0..24).map(|h| TimeOfDay::from_hour(h).code()).collect();
        assert_eq!(
            codes,
            vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 4]
        );
        assert_eq!(TimeOfDay::EveningRush.column_label(), "Evening_Rush");
    }

    #[test]
    fn test_calendar() {
        // 2025-07-05 is a Saturday.
        let t = NaiveDate::from_ymd_opt(2025, 7, 5)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let cal = Calendar::of(&t);
        assert_eq!(cal.day_of_week, 5);
        assert!(cal.is_weekend);
        let (s, c) = cal.cyclic_hour();
        assert!((s - 1.0).abs() < 1e-12);
        assert!(c.abs() < 1e-12);
    }
}
