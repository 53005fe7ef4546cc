//! Client sessions bounded by start and end lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AppUsername, SessionId};

/// A bounded sequence of events sharing a session ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "sessionId")]
    pub id: SessionId,
    pub app_username: AppUsername,
    pub started_at: DateTime<Utc>,
    /// Set once the client reports the session end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Session {
    /// Creates an open session.
    pub fn new(id: SessionId, app_username: AppUsername, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            app_username,
            started_at,
            ended_at: None,
            metadata: None,
        }
    }

    /// Session length in milliseconds, if the session has ended.
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|ended| (ended - self.started_at).num_milliseconds())
    }

    pub const fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// A session as shown in dashboard listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListing {
    #[serde(flatten)]
    pub session: Session,
    pub event_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

impl SessionListing {
    pub fn new(session: Session, event_count: usize) -> Self {
        let duration_ms = session.duration_ms();
        Self {
            session,
            event_count,
            duration_ms,
        }
    }
}
