//! Storage layer for usage analytics.
//!
//! Provides persistence for sessions and events using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. The HTTP server wraps it
//! in a `Mutex` and only touches it from blocking tasks.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! and a `Z` suffix (e.g., `2024-01-15T10:30:00.000Z`). Every writer goes
//! through [`format_timestamp`], so:
//! - Lexicographic ordering matches chronological ordering
//! - Range filters can run on the raw column
//! - Values stay human-readable in the database
//!
//! Values are parsed back on read; a row that fails to parse is reported as
//! [`DbError::TimestampParse`] rather than skipped.
//!
//! ## Event Payload Storage
//!
//! The `data` column stores the client's optional JSON payload verbatim.
//! The `name` column is the free-text event label used by latency analysis.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};
use thiserror::Error;
use uuid::Uuid;

use ua_core::{
    AppUsername, Event, EventId, EventStore, Session, SessionId, SessionListing, TimeWindow,
    ValidationError,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {id}: {timestamp}")]
    TimestampParse {
        id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row violates a domain invariant (empty id, broken JSON, ...).
    #[error("invalid record {id}: {message}")]
    InvalidRecord { id: String, message: String },
    /// A session with this ID already exists.
    #[error("session already exists: {0}")]
    SessionExists(String),
    /// No session with this ID.
    #[error("session not found: {0}")]
    SessionNotFound(String),
    /// The session was already closed with a different end time.
    #[error("session already ended: {0}")]
    SessionAlreadyEnded(String),
    /// The requested end time precedes the session start.
    #[error("session {session_id} cannot end before it started")]
    EndBeforeStart { session_id: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// An event row as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub id: String,
    pub session_id: String,
    pub app_username: String,
    pub name: String,
    pub event_type: Option<String>,
    pub timestamp: String,
    pub data: Option<String>,
}

/// A session row as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub app_username: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub metadata: Option<String>,
}

/// Row counts and recency, for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub event_count: i64,
    pub session_count: i64,
    pub latest_event_at: Option<String>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                app_username TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                metadata TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(app_username);

            -- Events table: interaction events reported by client sessions
            -- timestamp: RFC 3339 with milliseconds (e.g., '2024-01-15T10:30:00.000Z')
            -- name: free-text label inspected by latency analysis
            -- data: optional JSON payload
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                app_username TEXT NOT NULL,
                name TEXT NOT NULL,
                type TEXT,
                timestamp TEXT NOT NULL,
                data TEXT,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_session ON events(session_id);
            CREATE INDEX IF NOT EXISTS idx_events_user ON events(app_username);
            ",
        )?;
        Ok(())
    }

    // ========== Sessions ==========

    /// Records a new session.
    ///
    /// Fails with [`DbError::SessionExists`] if the ID is taken.
    pub fn insert_session(&mut self, session: &Session) -> Result<(), DbError> {
        let record = SessionRecord::from(session);
        let inserted = self.conn.execute(
            "
            INSERT OR IGNORE INTO sessions (id, app_username, started_at, ended_at, metadata)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                record.id,
                record.app_username,
                record.started_at,
                record.ended_at,
                record.metadata,
            ],
        )?;
        if inserted == 0 {
            return Err(DbError::SessionExists(record.id));
        }
        tracing::debug!(session = %session.id, "session started");
        Ok(())
    }

    /// Closes a session.
    ///
    /// Ending a session twice with the same timestamp is a no-op; a different
    /// timestamp is rejected.
    pub fn end_session(
        &mut self,
        id: &SessionId,
        ended_at: DateTime<Utc>,
    ) -> Result<Session, DbError> {
        let Some(mut session) = self.get_session(id.as_str())? else {
            return Err(DbError::SessionNotFound(id.to_string()));
        };

        let ended_at = truncate_to_millis(ended_at);
        match session.ended_at {
            Some(existing) if existing == ended_at => return Ok(session),
            Some(_) => return Err(DbError::SessionAlreadyEnded(id.to_string())),
            None => {}
        }
        if ended_at < session.started_at {
            return Err(DbError::EndBeforeStart {
                session_id: id.to_string(),
            });
        }

        self.conn.execute(
            "UPDATE sessions SET ended_at = ? WHERE id = ?",
            params![format_timestamp(ended_at), id.as_str()],
        )?;
        session.ended_at = Some(ended_at);
        tracing::debug!(session = %id, "session ended");
        Ok(session)
    }

    /// Looks up a session by ID.
    pub fn get_session(&self, id: &str) -> Result<Option<Session>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, app_username, started_at, ended_at, metadata
            FROM sessions
            WHERE id = ?
            ",
        )?;
        let mut rows = stmt.query_map([id], session_row)?;
        match rows.next() {
            Some(row) => Ok(Some(Session::try_from(row?)?)),
            None => Ok(None),
        }
    }

    /// Lists sessions started within the window, newest first, with event counts.
    pub fn list_sessions(
        &self,
        window: &TimeWindow,
        app_username: Option<&str>,
    ) -> Result<Vec<SessionListing>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT s.id, s.app_username, s.started_at, s.ended_at, s.metadata, COUNT(e.id)
            FROM sessions s
            LEFT JOIN events e ON e.session_id = s.id
            WHERE s.started_at >= ?1 AND s.started_at <= ?2
              AND (?3 IS NULL OR s.app_username = ?3)
            GROUP BY s.id
            ORDER BY s.started_at DESC, s.id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                format_timestamp(window.start()),
                format_timestamp(window.end()),
                app_username,
            ],
            |row| Ok((session_row(row)?, row.get::<_, i64>(5)?)),
        )?;

        let mut listings = Vec::new();
        for row in rows {
            let (record, event_count) = row?;
            let session = Session::try_from(record)?;
            listings.push(SessionListing::new(
                session,
                usize::try_from(event_count).unwrap_or_default(),
            ));
        }
        Ok(listings)
    }

    /// Lists sessions started within the window, oldest first.
    pub fn sessions_in_range(&self, window: &TimeWindow) -> Result<Vec<Session>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, app_username, started_at, ended_at, metadata
            FROM sessions
            WHERE started_at >= ? AND started_at <= ?
            ORDER BY started_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            [format_timestamp(window.start()), format_timestamp(window.end())],
            session_row,
        )?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(Session::try_from(row?)?);
        }
        Ok(sessions)
    }

    // ========== Events ==========

    /// Inserts a batch of events, ignoring duplicates by ID.
    ///
    /// Every referenced session must already exist.
    pub fn insert_events(&mut self, events: &[EventRecord]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let inserted = insert_event_rows(&tx, events)?;
        tx.commit()?;
        tracing::debug!(received = events.len(), inserted, "stored events");
        Ok(inserted)
    }

    /// Creates missing sessions and stores events in a single transaction.
    ///
    /// Existing sessions are left untouched. If any event is rejected nothing
    /// is written, including the sessions.
    /// Returns `(sessions_created, events_inserted)`.
    pub fn import(
        &mut self,
        sessions: &[Session],
        events: &[EventRecord],
    ) -> Result<(usize, usize), DbError> {
        let tx = self.conn.transaction()?;
        let sessions_created = insert_session_rows(&tx, sessions)?;
        let inserted = insert_event_rows(&tx, events)?;
        tx.commit()?;
        tracing::debug!(sessions_created, inserted, "imported events");
        Ok((sessions_created, inserted))
    }

    /// Lists events within the window (bounds included), optionally for one user.
    ///
    /// Ordered by timestamp then ID.
    pub fn list_events_in_range(
        &self,
        window: &TimeWindow,
        app_username: Option<&str>,
    ) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, session_id, app_username, name, type, timestamp, data
            FROM events
            WHERE timestamp >= ?1 AND timestamp <= ?2
              AND (?3 IS NULL OR app_username = ?3)
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                format_timestamp(window.start()),
                format_timestamp(window.end()),
                app_username,
            ],
            event_row,
        )?;
        collect_events(rows)
    }

    /// Lists all events of one session in chronological order.
    pub fn events_for_session(&self, session_id: &str) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, session_id, app_username, name, type, timestamp, data
            FROM events
            WHERE session_id = ?
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([session_id], event_row)?;
        collect_events(rows)
    }

    /// Returns row counts and the latest event timestamp.
    pub fn stats(&self) -> Result<StoreStats, DbError> {
        let (event_count, latest_event_at) = self.conn.query_row(
            "SELECT COUNT(*), MAX(timestamp) FROM events",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let session_count = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(StoreStats {
            event_count,
            session_count,
            latest_event_at,
        })
    }
}

impl EventStore for Database {
    type Error = DbError;

    fn fetch_events_in_range(&self, window: &TimeWindow) -> Result<Vec<Event>, DbError> {
        self.list_events_in_range(window, None)
    }
}

fn event_row(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
    Ok(EventRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        app_username: row.get(2)?,
        name: row.get(3)?,
        event_type: row.get(4)?,
        timestamp: row.get(5)?,
        data: row.get(6)?,
    })
}

fn session_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        app_username: row.get(1)?,
        started_at: row.get(2)?,
        ended_at: row.get(3)?,
        metadata: row.get(4)?,
    })
}

fn collect_events(
    rows: impl Iterator<Item = rusqlite::Result<EventRecord>>,
) -> Result<Vec<Event>, DbError> {
    let mut events = Vec::new();
    for row in rows {
        events.push(Event::try_from(row?)?);
    }
    Ok(events)
}

// ========== Record conversions ==========

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.to_string(),
            session_id: event.session_id.to_string(),
            app_username: event.app_username.to_string(),
            name: event.name.clone(),
            event_type: event.event_type.clone(),
            timestamp: format_timestamp(event.timestamp),
            data: event.data.as_ref().map(serde_json::Value::to_string),
        }
    }
}

impl TryFrom<EventRecord> for Event {
    type Error = DbError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let timestamp = parse_timestamp(&record.timestamp, &record.id)?;
        let data = parse_json(record.data.as_deref(), &record.id)?;
        Ok(Self {
            id: EventId::new(record.id.as_str()).map_err(|e| invalid(&record.id, &e))?,
            session_id: SessionId::new(record.session_id).map_err(|e| invalid(&record.id, &e))?,
            app_username: AppUsername::new(record.app_username)
                .map_err(|e| invalid(&record.id, &e))?,
            name: record.name,
            event_type: record.event_type,
            timestamp,
            data,
        })
    }
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.to_string(),
            app_username: session.app_username.to_string(),
            started_at: format_timestamp(session.started_at),
            ended_at: session.ended_at.map(format_timestamp),
            metadata: session.metadata.as_ref().map(serde_json::Value::to_string),
        }
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = DbError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        let started_at = parse_timestamp(&record.started_at, &record.id)?;
        let ended_at = record
            .ended_at
            .as_deref()
            .map(|ts| parse_timestamp(ts, &record.id))
            .transpose()?;
        let metadata = parse_json(record.metadata.as_deref(), &record.id)?;
        Ok(Self {
            id: SessionId::new(record.id.as_str()).map_err(|e| invalid(&record.id, &e))?,
            app_username: AppUsername::new(record.app_username)
                .map_err(|e| invalid(&record.id, &e))?,
            started_at,
            ended_at,
            metadata,
        })
    }
}

fn invalid(id: &str, err: &ValidationError) -> DbError {
    DbError::InvalidRecord {
        id: id.to_string(),
        message: err.to_string(),
    }
}

fn parse_json(raw: Option<&str>, id: &str) -> Result<Option<serde_json::Value>, DbError> {
    raw.map(|raw| {
        serde_json::from_str(raw).map_err(|e| DbError::InvalidRecord {
            id: id.to_string(),
            message: format!("invalid JSON payload: {e}"),
        })
    })
    .transpose()
}

fn insert_session_rows(conn: &Connection, sessions: &[Session]) -> Result<usize, DbError> {
    let mut stmt = conn.prepare(
        "
        INSERT OR IGNORE INTO sessions (id, app_username, started_at, ended_at, metadata)
        VALUES (?, ?, ?, ?, ?)
        ",
    )?;
    let mut inserted = 0;
    for session in sessions {
        let record = SessionRecord::from(session);
        inserted += stmt.execute(params![
            record.id,
            record.app_username,
            record.started_at,
            record.ended_at,
            record.metadata,
        ])?;
    }
    Ok(inserted)
}

fn insert_event_rows(conn: &Connection, events: &[EventRecord]) -> Result<usize, DbError> {
    let mut stmt = conn.prepare(
        "
        INSERT OR IGNORE INTO events
        (id, session_id, app_username, name, type, timestamp, data)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
    )?;
    let mut inserted = 0;
    for event in events {
        inserted += stmt.execute(params![
            event.id,
            event.session_id,
            event.app_username,
            event.name,
            event.event_type,
            event.timestamp,
            event.data,
        ])?;
    }
    Ok(inserted)
}

fn parse_timestamp(timestamp: &str, id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

/// Formats a timestamp the way every stored timestamp is written.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Derives a stable event ID for sources that omit one.
///
/// Every stored field feeds the hash, so re-importing the same line yields
/// the same ID while events that differ only in type or payload stay distinct.
pub fn derived_event_id(
    session_id: &str,
    name: &str,
    event_type: Option<&str>,
    timestamp: DateTime<Utc>,
    data: Option<&serde_json::Value>,
) -> String {
    let content = serde_json::json!([
        "event",
        session_id,
        name,
        event_type,
        format_timestamp(timestamp),
        data,
    ]);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, content.to_string().as_bytes()).to_string()
}

/// Drops sub-millisecond precision, matching what the store keeps.
pub fn truncate_to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp.timestamp_millis()).unwrap_or(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use chrono::{Duration, TimeZone};
    use ua_core::{LatencyQuery, latency_report};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn session(id: &str, user: &str, start: i64) -> Session {
        Session::new(
            SessionId::new(id).unwrap(),
            AppUsername::new(user).unwrap(),
            t(start),
        )
    }

    fn event(id: &str, session: &str, user: &str, name: &str, at: DateTime<Utc>) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            session_id: session.to_string(),
            app_username: user.to_string(),
            name: name.to_string(),
            event_type: None,
            timestamp: format_timestamp(at),
            data: None,
        }
    }

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.insert_session(&session("s1", "ana", 0)).unwrap();
        db.insert_session(&session("s2", "luis", 60)).unwrap();
        db.insert_events(&[
            event("e1", "s1", "ana", "inference_start", t(1)),
            event("e2", "s1", "ana", "inference_response", t(2)),
            event("e3", "s2", "luis", "inference_start", t(61)),
            event("e4", "s2", "luis", "inference_response", t(70)),
        ])
        .unwrap();
        db
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(
            table_columns(&db.conn, "events"),
            vec![
                "id",
                "session_id",
                "app_username",
                "name",
                "type",
                "timestamp",
                "data",
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "sessions"),
            vec!["id", "app_username", "started_at", "ended_at", "metadata"]
        );

        let event_indexes = index_names(&db.conn, "events");
        let expected: HashSet<String> = [
            "idx_events_timestamp",
            "idx_events_session",
            "idx_events_user",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert!(expected.is_subset(&event_indexes));

        let session_indexes = index_names(&db.conn, "sessions");
        assert!(session_indexes.contains("idx_sessions_started"));
        assert!(session_indexes.contains("idx_sessions_user"));
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    #[test]
    fn insert_events_is_idempotent() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.insert_session(&session("s1", "ana", 0)).unwrap();
        let record = event("e1", "s1", "ana", "click", t(1));

        let inserted = db.insert_events(&[record.clone(), record]).unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(db.stats().unwrap().event_count, 1);
    }

    #[test]
    fn insert_events_requires_existing_session() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let result = db.insert_events(&[event("e1", "missing", "ana", "click", t(1))]);
        assert!(matches!(result, Err(DbError::Sqlite(_))));
    }

    #[test]
    fn event_roundtrips_through_record() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.insert_session(&session("s1", "ana", 0)).unwrap();
        let original = Event {
            id: EventId::new("e1").unwrap(),
            session_id: SessionId::new("s1").unwrap(),
            app_username: AppUsername::new("ana").unwrap(),
            name: "inference_start".to_string(),
            event_type: Some("model".to_string()),
            timestamp: t(5) + Duration::milliseconds(250),
            data: Some(serde_json::json!({"model": "small"})),
        };
        db.insert_events(&[EventRecord::from(&original)]).unwrap();

        let stored = db.events_for_session("s1").unwrap();
        assert_eq!(stored, vec![original]);
    }

    #[test]
    fn range_query_is_inclusive() {
        let db = seeded();
        let window = TimeWindow::new(t(2), t(61)).unwrap();
        let ids: Vec<_> = db
            .list_events_in_range(&window, None)
            .unwrap()
            .into_iter()
            .map(|e| e.id.to_string())
            .collect();
        assert_eq!(ids, vec!["e2", "e3"]);
    }

    #[test]
    fn range_query_filters_by_user() {
        let db = seeded();
        let window = TimeWindow::new(t(0), t(100)).unwrap();
        let events = db.list_events_in_range(&window, Some("luis")).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.app_username.as_str() == "luis"));
    }

    #[test]
    fn malformed_timestamp_is_an_error() {
        let mut db = seeded();
        let mut bad = event("bad", "s1", "ana", "inference_start", t(3));
        bad.timestamp = "2025-01-15T12:00:03 not a time".to_string();
        db.insert_events(&[bad]).unwrap();

        let window = TimeWindow::new(t(0), t(100)).unwrap();
        let err = db.list_events_in_range(&window, None).unwrap_err();
        assert!(matches!(err, DbError::TimestampParse { ref id, .. } if id == "bad"));
    }

    #[test]
    fn latency_report_runs_against_database() {
        let db = seeded();
        let query = LatencyQuery {
            window: TimeWindow::new(t(0), t(100)).unwrap(),
            app_username: None,
        };
        let report = latency_report(&db, &query).unwrap();
        assert_eq!(report.summary.count, 2);
        assert_eq!(report.summary.min, 1_000);
        assert_eq!(report.summary.max, 9_000);
        assert_eq!(report.summary.average, 5_000);
    }

    #[test]
    fn duplicate_session_is_rejected() {
        let mut db = seeded();
        let err = db.insert_session(&session("s1", "ana", 5)).unwrap_err();
        assert!(matches!(err, DbError::SessionExists(ref id) if id == "s1"));
    }

    #[test]
    fn end_session_lifecycle() {
        let mut db = seeded();
        let id = SessionId::new("s1").unwrap();

        let ended = db.end_session(&id, t(30)).unwrap();
        assert_eq!(ended.duration_ms(), Some(30_000));

        // Same end time again is accepted, a different one is not.
        assert!(db.end_session(&id, t(30)).is_ok());
        let err = db.end_session(&id, t(31)).unwrap_err();
        assert!(matches!(err, DbError::SessionAlreadyEnded(_)));

        let stored = db.get_session("s1").unwrap().unwrap();
        assert_eq!(stored.ended_at, Some(t(30)));
    }

    #[test]
    fn end_session_rejects_unknown_and_backwards() {
        let mut db = seeded();
        let err = db
            .end_session(&SessionId::new("nope").unwrap(), t(10))
            .unwrap_err();
        assert!(matches!(err, DbError::SessionNotFound(_)));

        let err = db
            .end_session(&SessionId::new("s2").unwrap(), t(10))
            .unwrap_err();
        assert!(matches!(err, DbError::EndBeforeStart { .. }));
    }

    #[test]
    fn list_sessions_newest_first_with_counts() {
        let mut db = seeded();
        db.insert_session(&session("s3", "ana", 90)).unwrap();
        let window = TimeWindow::new(t(0), t(100)).unwrap();

        let listings = db.list_sessions(&window, None).unwrap();
        let summary: Vec<_> = listings
            .iter()
            .map(|l| (l.session.id.to_string(), l.event_count))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("s3".to_string(), 0),
                ("s2".to_string(), 2),
                ("s1".to_string(), 2),
            ]
        );

        let ana = db.list_sessions(&window, Some("ana")).unwrap();
        assert_eq!(ana.len(), 2);
    }

    #[test]
    fn import_skips_existing_sessions() {
        let mut db = seeded();
        let (created, _) = db
            .import(&[session("s1", "other", 0), session("s9", "ana", 5)], &[])
            .unwrap();
        assert_eq!(created, 1);
        assert_eq!(
            db.get_session("s1").unwrap().unwrap().app_username.as_str(),
            "ana"
        );
    }

    #[test]
    fn stats_reports_counts() {
        let db = seeded();
        let stats = db.stats().unwrap();
        assert_eq!(stats.event_count, 4);
        assert_eq!(stats.session_count, 2);
        assert_eq!(stats.latest_event_at, Some(format_timestamp(t(70))));
    }

    #[test]
    fn derived_event_id_is_stable() {
        let a = derived_event_id("s1", "click", None, t(1), None);
        assert_eq!(a, derived_event_id("s1", "click", None, t(1), None));
        assert_ne!(a, derived_event_id("s1", "click", None, t(2), None));
        assert_ne!(a, derived_event_id("s2", "click", None, t(1), None));
        assert_ne!(a, derived_event_id("s1", "click", Some("ui"), t(1), None));
    }

    #[test]
    fn derived_event_id_covers_payload() {
        let a = serde_json::json!({"button": "a"});
        let b = serde_json::json!({"button": "b"});
        let id_a = derived_event_id("s1", "click", None, t(1), Some(&a));
        assert_eq!(id_a, derived_event_id("s1", "click", None, t(1), Some(&a)));
        assert_ne!(id_a, derived_event_id("s1", "click", None, t(1), Some(&b)));
        assert_ne!(id_a, derived_event_id("s1", "click", None, t(1), None));
    }

    #[test]
    fn import_writes_sessions_and_events_together() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let (sessions, events) = db
            .import(
                &[session("s1", "ana", 0)],
                &[
                    event("e1", "s1", "ana", "click", t(1)),
                    event("e2", "s1", "ana", "click", t(2)),
                ],
            )
            .unwrap();
        assert_eq!((sessions, events), (1, 2));

        let again = db
            .import(&[session("s1", "ana", 0)], &[event("e1", "s1", "ana", "click", t(1))])
            .unwrap();
        assert_eq!(again, (0, 0));
    }

    #[test]
    fn failed_import_leaves_no_sessions_behind() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let result = db.import(
            &[session("s1", "ana", 0)],
            &[
                event("e1", "s1", "ana", "click", t(1)),
                event("e2", "missing", "ana", "click", t(2)),
            ],
        );

        assert!(matches!(result, Err(DbError::Sqlite(_))));
        assert!(db.get_session("s1").unwrap().is_none());
        let stats = db.stats().unwrap();
        assert_eq!(stats.session_count, 0);
        assert_eq!(stats.event_count, 0);
    }

    #[test]
    fn data_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ua.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.insert_session(&session("s1", "ana", 0)).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert!(db.get_session("s1").unwrap().is_some());
    }
}
