//! Inclusive time windows for statistics queries.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// An inclusive `[start, end]` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedWindow {
                start: start.to_rfc3339_opts(SecondsFormat::Millis, true),
                end: end.to_rfc3339_opts(SecondsFormat::Millis, true),
            });
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to and including `end`.
    ///
    /// Fails when the start would fall before the earliest representable
    /// timestamp.
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Result<Self, ValidationError> {
        let start = end
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| ValidationError::WindowOutOfRange {
                end: end.to_rfc3339_opts(SecondsFormat::Millis, true),
                days,
            })?;
        Ok(Self { start, end })
    }

    /// Fills in missing bounds: `end` defaults to `now`, `start` to
    /// `default_days` before the end.
    pub fn resolve(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        default_days: u32,
    ) -> Result<Self, ValidationError> {
        let end = end.unwrap_or(now);
        match start {
            Some(start) => Self::new(start, end),
            None => Self::trailing_days(end, default_days),
        }
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if `timestamp` lies within the window, bounds included.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// Which end of a window a bare date should snap to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// Midnight at the beginning of the day.
    Start,
    /// The last millisecond of the day.
    End,
}

/// Parses an RFC 3339 timestamp or a `YYYY-MM-DD` date.
///
/// Bare dates are interpreted in UTC and snapped according to `bound`, so a
/// window of `2025-01-01..2025-01-31` covers both days completely.
pub fn parse_date_bound(
    value: &str,
    bound: DateBound,
    field: &'static str,
) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        }
    })?;
    let time = match bound {
        DateBound::Start => NaiveTime::MIN,
        DateBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}
