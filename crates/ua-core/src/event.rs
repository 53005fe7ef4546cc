//! Interaction events reported by client applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AppUsername, EventId, SessionId};

/// A single timestamped, named occurrence logged by a client session.
///
/// Events are immutable once stored; analytics only ever read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique identifier for this event.
    #[serde(rename = "eventId")]
    pub id: EventId,
    /// The session this event belongs to.
    pub session_id: SessionId,
    /// The end user who generated the event.
    pub app_username: AppUsername,
    /// Free-text label, e.g. `inference_start` or `respuesta_inferencia`.
    #[serde(rename = "eventName")]
    pub name: String,
    /// Optional client-supplied category. Not used for latency pairing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Optional additional context as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// An event suitable for latency pairing.
///
/// This trait allows classification and pairing to work with different event
/// representations (e.g., [`Event`], or lightweight test fixtures).
pub trait TrackedEvent {
    /// Returns the event's unique ID.
    fn event_id(&self) -> &str;

    /// Returns the ID of the session the event belongs to.
    fn session_id(&self) -> &str;

    /// Returns the free-text event name inspected by the classifier.
    fn event_name(&self) -> &str;

    /// Returns the event's timestamp.
    fn timestamp(&self) -> DateTime<Utc>;
}

impl TrackedEvent for Event {
    fn event_id(&self) -> &str {
        self.id.as_str()
    }

    fn session_id(&self) -> &str {
        self.session_id.as_str()
    }

    fn event_name(&self) -> &str {
        &self.name
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
