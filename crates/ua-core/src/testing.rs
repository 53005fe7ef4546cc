//! Lightweight event fixtures shared by unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::event::{Event, TrackedEvent};
use crate::types::{AppUsername, EventId, SessionId};

#[derive(Debug, Clone)]
pub struct TestEvent {
    pub id: String,
    pub session: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

impl TrackedEvent for TestEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn session_id(&self) -> &str {
        &self.session
    }

    fn event_name(&self) -> &str {
        &self.name
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Milliseconds since the Unix epoch as a UTC timestamp.
pub fn ms(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

pub fn ev(id: &str, session: &str, name: &str, millis: i64) -> TestEvent {
    TestEvent {
        id: id.to_string(),
        session: session.to_string(),
        name: name.to_string(),
        timestamp: ms(millis),
    }
}

pub fn event(id: &str, session: &str, user: &str, name: &str, millis: i64) -> Event {
    Event {
        id: EventId::new(id).unwrap(),
        session_id: SessionId::new(session).unwrap(),
        app_username: AppUsername::new(user).unwrap(),
        name: name.to_string(),
        event_type: None,
        timestamp: ms(millis),
        data: None,
    }
}
