//! Per-user and overall usage statistics.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::session::Session;
use crate::summary::rounded_mean;

/// Activity of one end user within a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub app_username: String,
    pub session_count: usize,
    pub event_count: usize,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Sum of ended session durations in milliseconds.
    pub total_session_ms: i64,
}

impl UserActivity {
    fn new(app_username: &str) -> Self {
        Self {
            app_username: app_username.to_string(),
            session_count: 0,
            event_count: 0,
            first_seen: None,
            last_seen: None,
            total_session_ms: 0,
        }
    }

    fn observe(&mut self, timestamp: DateTime<Utc>) {
        self.first_seen = Some(self.first_seen.map_or(timestamp, |seen| seen.min(timestamp)));
        self.last_seen = Some(self.last_seen.map_or(timestamp, |seen| seen.max(timestamp)));
    }
}

/// Builds per-user activity from the sessions and events of a window.
///
/// Sorted by event count (descending), then username.
pub fn user_activity(sessions: &[Session], events: &[Event]) -> Vec<UserActivity> {
    let mut by_user: BTreeMap<&str, UserActivity> = BTreeMap::new();

    for session in sessions {
        let user = session.app_username.as_str();
        let activity = by_user
            .entry(user)
            .or_insert_with(|| UserActivity::new(user));
        activity.session_count += 1;
        activity.total_session_ms = activity
            .total_session_ms
            .saturating_add(session.duration_ms().unwrap_or(0).max(0));
        activity.observe(session.started_at);
        if let Some(ended) = session.ended_at {
            activity.observe(ended);
        }
    }

    for event in events {
        let user = event.app_username.as_str();
        let activity = by_user
            .entry(user)
            .or_insert_with(|| UserActivity::new(user));
        activity.event_count += 1;
        activity.observe(event.timestamp);
    }

    let mut activity: Vec<UserActivity> = by_user.into_values().collect();
    activity.sort_by(|a, b| {
        b.event_count
            .cmp(&a.event_count)
            .then_with(|| a.app_username.cmp(&b.app_username))
    });
    activity
}

/// Dashboard totals for a window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_sessions: usize,
    pub open_sessions: usize,
    pub total_events: usize,
    pub active_users: usize,
    /// Mean length of ended sessions, rounded half away from zero.
    pub average_session_ms: i64,
}

/// Computes dashboard totals.
///
/// A user counts as active if they started a session or emitted an event.
pub fn overview(sessions: &[Session], events: &[Event]) -> Overview {
    let users: HashSet<&str> = sessions
        .iter()
        .map(|s| s.app_username.as_str())
        .chain(events.iter().map(|e| e.app_username.as_str()))
        .collect();

    let durations: Vec<i64> = sessions.iter().filter_map(Session::duration_ms).collect();
    let total = durations.iter().copied().fold(0, i64::saturating_add);

    Overview {
        total_sessions: sessions.len(),
        open_sessions: sessions.iter().filter(|s| s.is_open()).count(),
        total_events: events.len(),
        active_users: users.len(),
        average_session_ms: rounded_mean(total, durations.len()),
    }
}
