//! Latency command for inspecting inference response times offline.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;

use ua_api::ApiResponse;
use ua_core::{DateBound, LatencyQuery, LatencyReport, MatchedPair, TimeWindow, latency_report};

use super::open_database;
use super::util::parse_bound;
use crate::Config;

#[derive(Debug, Args)]
pub struct LatencyArgs {
    /// Window start: RFC 3339, YYYY-MM-DD, or relative ("7 days ago").
    #[arg(long)]
    pub start: Option<String>,

    /// Window end (defaults to now).
    #[arg(long)]
    pub end: Option<String>,

    /// Only include events from this app user.
    #[arg(long)]
    pub user: Option<String>,

    /// Print the same JSON document the API returns.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &LatencyArgs, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let query = build_query(args, Utc::now(), config.stats.default_window_days)?;
    let report = latency_report(&db, &query).context("failed to compute inference latency")?;

    if args.json {
        serde_json::to_writer_pretty(&mut *writer, &ApiResponse::success(&report))?;
        writeln!(writer)?;
    } else {
        write_report(writer, &query, &report)?;
    }
    Ok(())
}

fn build_query(args: &LatencyArgs, now: DateTime<Utc>, default_days: u32) -> Result<LatencyQuery> {
    let start = args
        .start
        .as_deref()
        .map(|value| parse_bound(value, DateBound::Start, now))
        .transpose()?;
    let end = args
        .end
        .as_deref()
        .map(|value| parse_bound(value, DateBound::End, now))
        .transpose()?;
    let window = TimeWindow::resolve(start, end, now, default_days)?;
    let app_username = args
        .user
        .as_deref()
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(str::to_string);
    Ok(LatencyQuery {
        window,
        app_username,
    })
}

fn write_report<W: Write>(writer: &mut W, query: &LatencyQuery, report: &LatencyReport) -> Result<()> {
    writeln!(writer, "Inference latency")?;
    writeln!(
        writer,
        "Window: {} .. {}",
        format_time(query.window.start()),
        format_time(query.window.end())
    )?;
    writeln!(writer, "User: {}", query.app_username.as_deref().unwrap_or("all"))?;

    let summary = &report.summary;
    if summary.count == 0 {
        writeln!(writer, "No inference pairs found.")?;
        return Ok(());
    }

    writeln!(writer, "Pairs: {}", summary.count)?;
    writeln!(writer, "Average: {} ms", summary.average)?;
    if let Some(pair) = &summary.pair_at_min {
        writeln!(writer, "Min: {}", describe(pair))?;
    }
    if let Some(pair) = &summary.pair_at_max {
        writeln!(writer, "Max: {}", describe(pair))?;
    }
    Ok(())
}

fn describe(pair: &MatchedPair) -> String {
    format!(
        "{} ms (session {}, started {})",
        pair.duration_ms,
        pair.session_id,
        format_time(pair.start_time)
    )
}

fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use insta::assert_snapshot;
    use ua_core::analyze_events;
    use ua_core::{AppUsername, Event, EventId, SessionId};

    fn event(id: &str, session: &str, name: &str, ms: i64) -> Event {
        Event {
            id: EventId::new(id).unwrap(),
            session_id: SessionId::new(session).unwrap(),
            app_username: AppUsername::new("ana").unwrap(),
            name: name.to_string(),
            event_type: None,
            timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
                + chrono::Duration::milliseconds(ms),
            data: None,
        }
    }

    fn args(start: Option<&str>, end: Option<&str>, user: Option<&str>) -> LatencyArgs {
        LatencyArgs {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
            user: user.map(str::to_string),
            json: false,
        }
    }

    fn day_query(user: Option<&str>) -> LatencyQuery {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        build_query(&args(Some("2025-01-15"), Some("2025-01-15"), user), now, 30).unwrap()
    }

    #[test]
    fn report_output() {
        let report = analyze_events(vec![
            event("a", "s1", "inference_start", 1_000),
            event("b", "s1", "inference_response", 1_250),
            event("c", "s2", "inicio_inferencia", 5_000),
            event("d", "s2", "respuesta_inferencia", 6_000),
        ]);
        let mut output = Vec::new();
        write_report(&mut output, &day_query(Some("ana")), &report).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Inference latency
        Window: 2025-01-15T00:00:00.000Z .. 2025-01-15T23:59:59.999Z
        User: ana
        Pairs: 2
        Average: 625 ms
        Min: 250 ms (session s1, started 2025-01-15T10:00:01.000Z)
        Max: 1000 ms (session s2, started 2025-01-15T10:00:05.000Z)
        ");
    }

    #[test]
    fn report_output_without_pairs() {
        let mut output = Vec::new();
        write_report(&mut output, &day_query(None), &LatencyReport::default()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Inference latency
        Window: 2025-01-15T00:00:00.000Z .. 2025-01-15T23:59:59.999Z
        User: all
        No inference pairs found.
        ");
    }

    #[test]
    fn default_window_trails_now() {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let query = build_query(&args(None, None, Some("  ")), now, 7).unwrap();
        assert_eq!(query.window.end(), now);
        assert_eq!(
            query.window.start(),
            Utc.with_ymd_and_hms(2025, 1, 25, 0, 0, 0).unwrap()
        );
        assert_eq!(query.app_username, None);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let err = build_query(&args(Some("2025-01-20"), Some("2025-01-10"), None), now, 30)
            .unwrap_err();
        assert!(err.to_string().contains("is after end"));
    }

    #[test]
    fn json_output_matches_api_shape() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("ua.db"),
            ..Config::default()
        };
        let mut output = Vec::new();
        let args = LatencyArgs {
            json: true,
            ..args(Some("2025-01-15"), Some("2025-01-15"), None)
        };
        run(&mut output, &args, &config).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["total"], 0);
        assert_eq!(value["data"]["maxPair"], serde_json::Value::Null);
        assert_eq!(value["data"]["allPairs"], serde_json::json!([]));
    }
}
