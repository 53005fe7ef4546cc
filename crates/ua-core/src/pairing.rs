//! Greedy start/response pairing within sessions.
//!
//! # Algorithm
//!
//! For each start candidate, in the order given:
//!
//! 1. Skip it if its event ID was already consumed by an earlier pair
//! 2. Collect unconsumed responses from the same session strictly after it
//! 3. Pick the earliest of those (first in response order on ties)
//! 4. Emit a pair if the whole-millisecond duration is positive, consuming
//!    both event IDs; otherwise discard it and consume nothing
//!
//! The consumed set lives only for the duration of one call.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::TrackedEvent;

/// One measured inference latency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPair {
    /// Milliseconds between start and response. Always positive.
    #[serde(rename = "duration")]
    pub duration_ms: i64,
    pub start_time: DateTime<Utc>,
    pub response_time: DateTime<Utc>,
    pub session_id: String,
    #[serde(skip)]
    pub start_event_id: String,
    #[serde(skip)]
    pub response_event_id: String,
}

/// Matches start candidates to response candidates.
///
/// Returns pairs in the order their starts were processed.
pub fn pair_candidates<'a, E: TrackedEvent>(
    starts: &[&'a E],
    responses: &[&'a E],
) -> Vec<MatchedPair> {
    let mut consumed: HashSet<&'a str> = HashSet::new();
    let mut pairs = Vec::new();

    for &start in starts {
        if consumed.contains(start.event_id()) {
            continue;
        }

        let start_time = start.timestamp();
        let earliest = responses
            .iter()
            .copied()
            .filter(|response| {
                response.session_id() == start.session_id()
                    && response.timestamp() > start_time
                    && !consumed.contains(response.event_id())
            })
            .min_by_key(|response| response.timestamp());

        let Some(response) = earliest else {
            continue;
        };

        let duration_ms = (response.timestamp() - start_time).num_milliseconds();
        if duration_ms <= 0 {
            tracing::debug!(
                start = start.event_id(),
                response = response.event_id(),
                "discarding sub-millisecond inference pair"
            );
            continue;
        }

        consumed.insert(start.event_id());
        consumed.insert(response.event_id());
        pairs.push(MatchedPair {
            duration_ms,
            start_time,
            response_time: response.timestamp(),
            session_id: start.session_id().to_string(),
            start_event_id: start.event_id().to_string(),
            response_event_id: response.event_id().to_string(),
        });
    }

    pairs
}
