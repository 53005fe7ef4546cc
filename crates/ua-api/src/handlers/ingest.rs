//! Ingestion endpoints called by client applications.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ua_core::{AppUsername, Event, EventId, Session, SessionId, ValidationError};
use ua_db::{Database, DbError, EventRecord, truncate_to_millis};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub session_id: Option<String>,
    pub app_username: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    pub session_id: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub event_id: Option<String>,
    pub session_id: String,
    pub app_username: Option<String>,
    pub event_name: String,
    pub event_type: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub events: Vec<EventRequest>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub received: usize,
    pub inserted: usize,
}

/// An event that passed validation but has not been matched to its session yet.
struct PendingEvent {
    id: EventId,
    session_id: SessionId,
    app_username: Option<AppUsername>,
    name: String,
    event_type: Option<String>,
    timestamp: DateTime<Utc>,
    data: Option<serde_json::Value>,
}

impl EventRequest {
    fn validate(self, now: DateTime<Utc>) -> Result<PendingEvent, ApiError> {
        let name = self.event_name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "eventName" }.into());
        }
        let id = match self.event_id {
            Some(id) => EventId::new(id)?,
            None => EventId::new(Uuid::new_v4().to_string())?,
        };
        Ok(PendingEvent {
            id,
            session_id: SessionId::new(self.session_id)?,
            app_username: self.app_username.map(AppUsername::new).transpose()?,
            name: name.to_string(),
            event_type: self.event_type,
            timestamp: truncate_to_millis(self.timestamp.unwrap_or(now)),
            data: self.data,
        })
    }
}

/// Attaches each event to its session and stores the batch.
///
/// Fails without writing anything if any referenced session is unknown.
fn store_events(
    db: &mut Database,
    pending: Vec<PendingEvent>,
) -> Result<(Vec<Event>, usize), DbError> {
    let mut owners: HashMap<SessionId, AppUsername> = HashMap::new();
    let mut events = Vec::with_capacity(pending.len());

    for event in pending {
        let owner = match owners.entry(event.session_id.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let session = db
                    .get_session(event.session_id.as_str())?
                    .ok_or_else(|| DbError::SessionNotFound(event.session_id.to_string()))?;
                entry.insert(session.app_username).clone()
            }
        };
        events.push(Event {
            id: event.id,
            session_id: event.session_id,
            app_username: event.app_username.unwrap_or(owner),
            name: event.name,
            event_type: event.event_type,
            timestamp: event.timestamp,
            data: event.data,
        });
    }

    let records: Vec<EventRecord> = events.iter().map(EventRecord::from).collect();
    let inserted = db.insert_events(&records)?;
    Ok((events, inserted))
}

/// POST /api/sessions/start
pub async fn start_session(
    State(state): State<AppState>,
    payload: Result<Json<StartSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Session>>), ApiError> {
    let Json(request) = payload?;
    let id = match request.session_id {
        Some(id) => SessionId::new(id)?,
        None => SessionId::new(Uuid::new_v4().to_string())?,
    };
    let started_at = truncate_to_millis(request.timestamp.unwrap_or_else(Utc::now));
    let mut session = Session::new(id, AppUsername::new(request.app_username)?, started_at);
    session.metadata = request.metadata;

    let session = state
        .with_db(move |db| {
            db.insert_session(&session)?;
            Ok(session)
        })
        .await?;
    tracing::debug!(session = %session.id, user = %session.app_username, "session started");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))))
}

/// POST /api/sessions/end
pub async fn end_session(
    State(state): State<AppState>,
    payload: Result<Json<EndSessionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Session>>, ApiError> {
    let Json(request) = payload?;
    let id = SessionId::new(request.session_id)?;
    let ended_at = request.timestamp.unwrap_or_else(Utc::now);

    let session = state
        .with_db(move |db| db.end_session(&id, ended_at))
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

/// POST /api/events
pub async fn record_event(
    State(state): State<AppState>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Event>>), ApiError> {
    let Json(request) = payload?;
    let pending = request.validate(Utc::now())?;

    let (mut events, _) = state
        .with_db(move |db| store_events(db, vec![pending]))
        .await?;
    let event = events
        .pop()
        .ok_or_else(|| ApiError::Internal("stored event missing".to_string()))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(event))))
}

/// POST /api/events/batch
pub async fn record_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchResponse>>, ApiError> {
    let Json(request) = payload?;
    let now = Utc::now();
    let pending = request
        .events
        .into_iter()
        .map(|event| event.validate(now))
        .collect::<Result<Vec<_>, _>>()?;
    let received = pending.len();

    let (_, inserted) = state
        .with_db(move |db| store_events(db, pending))
        .await?;
    tracing::debug!(received, inserted, "stored event batch");
    Ok(Json(ApiResponse::success(BatchResponse { received, inserted })))
}
