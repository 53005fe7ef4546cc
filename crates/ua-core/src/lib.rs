//! Core domain logic for usage analytics.
//!
//! This crate contains the fundamental types and logic for:
//! - Classification: spotting inference start/response markers in event names
//! - Pairing: matching each start to the earliest later response in its session
//! - Summary: latency statistics over matched pairs
//! - Activity: per-user and overall usage statistics

pub mod activity;
pub mod classify;
pub mod event;
pub mod latency;
pub mod pairing;
pub mod session;
pub mod summary;
pub mod types;
pub mod window;

#[cfg(test)]
mod testing;

pub use activity::{Overview, UserActivity, overview, user_activity};
pub use classify::{
    CandidateClassifier, Candidates, NameHeuristic, classify, is_response_candidate,
    is_start_candidate,
};
pub use event::{Event, TrackedEvent};
pub use latency::{
    EventStore, LatencyQuery, LatencyReport, analyze_events, analyze_events_with, filter_by_user,
    latency_report,
};
pub use pairing::{MatchedPair, pair_candidates};
pub use session::{Session, SessionListing};
pub use summary::{LatencySummary, rounded_mean, summarize};
pub use types::{AppUsername, EventId, SessionId, ValidationError};
pub use window::{DateBound, TimeWindow, parse_date_bound};
