//! Import command for loading exported events into the local `SQLite` store.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Deserialize;

use ua_core::{AppUsername, Event, EventId, Session, SessionId};
use ua_db::{EventRecord, derived_event_id, truncate_to_millis};

use super::open_database;
use crate::Config;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// JSONL file with one event per line (`-` or omitted reads stdin).
    pub file: Option<PathBuf>,
}

/// Outcome of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub read: usize,
    pub inserted: usize,
    pub sessions_created: usize,
}

pub fn run(args: &ImportArgs, config: &Config) -> Result<ImportSummary> {
    let events = match args.file.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            parse_events(BufReader::new(file))?
        }
        _ => parse_events(io::stdin().lock())?,
    };

    let mut db = open_database(config)?;
    let records: Vec<EventRecord> = events.iter().map(EventRecord::from).collect();
    let (sessions_created, inserted) = db
        .import(&implied_sessions(&events), &records)
        .context("failed to store imported events")?;

    tracing::debug!(read = events.len(), inserted, sessions_created, "import finished");
    Ok(ImportSummary {
        read: events.len(),
        inserted,
        sessions_created,
    })
}

fn parse_events<R: BufRead>(reader: R) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: ImportEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        let event = parsed
            .into_event()
            .with_context(|| format!("invalid event on line {}", idx + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// One session per referenced session ID, opened by its earliest event.
fn implied_sessions(events: &[Event]) -> Vec<Session> {
    let mut earliest: BTreeMap<&SessionId, &Event> = BTreeMap::new();
    for event in events {
        earliest
            .entry(&event.session_id)
            .and_modify(|current| {
                if event.timestamp < current.timestamp {
                    *current = event;
                }
            })
            .or_insert(event);
    }
    earliest
        .into_values()
        .map(|event| {
            Session::new(
                event.session_id.clone(),
                event.app_username.clone(),
                event.timestamp,
            )
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportEvent {
    #[serde(default)]
    event_id: Option<String>,
    session_id: String,
    app_username: String,
    event_name: String,
    #[serde(default)]
    event_type: Option<String>,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl ImportEvent {
    fn into_event(self) -> Result<Event> {
        let name = self.event_name.trim();
        if name.is_empty() {
            return Err(anyhow::anyhow!("missing eventName"));
        }
        let timestamp = truncate_to_millis(self.timestamp);
        let id = match self.event_id {
            Some(id) => id,
            None => derived_event_id(
                self.session_id.trim(),
                name,
                self.event_type.as_deref(),
                timestamp,
                self.data.as_ref(),
            ),
        };
        Ok(Event {
            id: EventId::new(id)?,
            session_id: SessionId::new(self.session_id)?,
            app_username: AppUsername::new(self.app_username)?,
            name: name.to_string(),
            event_type: self.event_type,
            timestamp,
            data: self.data,
        })
    }
}
