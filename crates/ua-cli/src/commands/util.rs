//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use ua_core::{DateBound, parse_date_bound};

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").expect("relative time regex is valid")
});

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parses a window bound given on the command line.
///
/// Supports:
/// - RFC 3339: "2025-01-15T10:30:00Z"
/// - Dates: "2025-01-15" (start or end of day depending on `bound`)
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_bound(
    s: &str,
    bound: DateBound,
    now: DateTime<Utc>,
) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Some(caps) = RELATIVE_TIME_RE.captures(s) {
        let n: i64 = caps[1]
            .parse()
            .context("failed to parse number in relative time")?;

        let (max_for_unit, minutes_per_unit) = match &caps[2] {
            "minute" => (MAX_RELATIVE_MINUTES, 1),
            "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
            "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
            "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
            unit => anyhow::bail!("Unknown time unit: {unit}"),
        };

        if n > max_for_unit {
            anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
        }
        return Ok(now - Duration::minutes(n * minutes_per_unit));
    }

    let field = match bound {
        DateBound::Start => "start",
        DateBound::End => "end",
    };
    parse_date_bound(s, bound, field).map_err(|_| {
        anyhow::anyhow!(
            "Invalid datetime: {s}. Use RFC 3339 (e.g., 2025-01-15T10:30:00Z), a date (2025-01-15) or relative (e.g., '7 days ago')"
        )
    })
}
