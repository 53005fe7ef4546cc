//! The inference latency pipeline: fetch → filter → sort → classify → pair → summarize.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::classify::{CandidateClassifier, NameHeuristic, classify};
use crate::event::Event;
use crate::pairing::{MatchedPair, pair_candidates};
use crate::summary::{LatencySummary, summarize};
use crate::window::TimeWindow;

/// Read access to persisted events.
///
/// Implemented by the SQLite store in `ua-db` and by plain event slices.
pub trait EventStore {
    type Error;

    /// Returns every event whose timestamp lies in the window, bounds included.
    ///
    /// No ordering is guaranteed.
    fn fetch_events_in_range(&self, window: &TimeWindow) -> Result<Vec<Event>, Self::Error>;
}

/// An already loaded snapshot, e.g. events copied out of a locked store.
impl EventStore for [Event] {
    type Error = Infallible;

    fn fetch_events_in_range(&self, window: &TimeWindow) -> Result<Vec<Event>, Infallible> {
        Ok(self
            .iter()
            .filter(|event| window.contains(event.timestamp))
            .cloned()
            .collect())
    }
}

/// Keeps only events generated by `app_username`.
pub fn filter_by_user(events: Vec<Event>, app_username: &str) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| event.app_username.as_str() == app_username)
        .collect()
}

/// Parameters of a latency statistics request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyQuery {
    pub window: TimeWindow,
    pub app_username: Option<String>,
}

/// Summary statistics plus every pair they were computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyReport {
    #[serde(flatten)]
    pub summary: LatencySummary,
    pub all_pairs: Vec<MatchedPair>,
}

/// Runs the full pipeline against a store.
///
/// Store errors are returned unchanged.
pub fn latency_report<S>(store: &S, query: &LatencyQuery) -> Result<LatencyReport, S::Error>
where
    S: EventStore + ?Sized,
{
    let events = store.fetch_events_in_range(&query.window)?;
    let events = match query.app_username.as_deref() {
        Some(user) => filter_by_user(events, user),
        None => events,
    };
    Ok(analyze_events(events))
}

/// Computes a report from an already fetched snapshot using the default
/// name heuristic.
pub fn analyze_events(events: Vec<Event>) -> LatencyReport {
    analyze_events_with(events, &NameHeuristic)
}

/// Computes a report with a custom classifier.
///
/// The snapshot is sorted by `(timestamp, eventId)` first so that starts are
/// processed chronologically whatever order the store returned them in.
pub fn analyze_events_with<C>(mut events: Vec<Event>, classifier: &C) -> LatencyReport
where
    C: CandidateClassifier + ?Sized,
{
    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });

    let candidates = classify(&events, classifier);
    let all_pairs = pair_candidates(&candidates.starts, &candidates.responses);
    let summary = summarize(&all_pairs);

    tracing::debug!(
        events = events.len(),
        pairs = summary.count,
        average_ms = summary.average,
        "computed inference latency"
    );

    LatencyReport { summary, all_pairs }
}
