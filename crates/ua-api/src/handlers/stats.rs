//! Dashboard endpoints. All of them require a bearer token.

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use ua_core::{
    DateBound, Event, EventStore, LatencyQuery, LatencyReport, Overview, SessionListing,
    TimeWindow, UserActivity, latency_report, overview as compute_overview, parse_date_bound,
    user_activity,
};
use ua_db::DbError;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

/// `?startDate=&endDate=&appUsername=`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub app_username: Option<String>,
}

impl RangeParams {
    /// Resolves the requested window, defaulting to the trailing
    /// `default_days` ending at `now`.
    pub fn window(&self, now: DateTime<Utc>, default_days: u32) -> Result<TimeWindow, ApiError> {
        let start = non_empty(self.start_date.as_deref())
            .map(|value| parse_date_bound(value, DateBound::Start, "startDate"))
            .transpose()?;
        let end = non_empty(self.end_date.as_deref())
            .map(|value| parse_date_bound(value, DateBound::End, "endDate"))
            .transpose()?;
        Ok(TimeWindow::resolve(start, end, now, default_days)?)
    }

    pub fn user(&self) -> Option<&str> {
        non_empty(self.app_username.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn resolve_window(state: &AppState, params: &RangeParams) -> Result<TimeWindow, ApiError> {
    params.window(Utc::now(), state.stats().default_window_days)
}

/// GET /api/stats/inference-latency
pub async fn inference_latency(
    State(state): State<AppState>,
    _auth: Authenticated,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<ApiResponse<LatencyReport>>, ApiError> {
    let Query(params) = params?;
    let window = resolve_window(&state, &params)?;

    let snapshot = state
        .with_db(move |db| db.fetch_events_in_range(&window))
        .await?;
    let query = LatencyQuery {
        window,
        app_username: params.user().map(str::to_string),
    };
    // The lock is already released; the pipeline runs over the copied rows.
    let Ok(report) = latency_report(snapshot.as_slice(), &query);

    tracing::debug!(
        start = %window.start(),
        end = %window.end(),
        user = params.user(),
        pairs = report.summary.count,
        "served inference latency"
    );
    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    _auth: Authenticated,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<SessionListing>>>, ApiError> {
    let Query(params) = params?;
    let window = resolve_window(&state, &params)?;
    let user = params.user().map(str::to_string);

    let sessions = state
        .with_db(move |db| db.list_sessions(&window, user.as_deref()))
        .await?;
    Ok(Json(ApiResponse::success(sessions)))
}

/// GET /api/sessions/{sessionId}/events
pub async fn session_events(
    State(state): State<AppState>,
    _auth: Authenticated,
    session_id: Result<Path<String>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<Event>>>, ApiError> {
    let Path(session_id) = session_id?;

    let events = state
        .with_db(move |db| {
            if db.get_session(&session_id)?.is_none() {
                return Err(DbError::SessionNotFound(session_id));
            }
            db.events_for_session(&session_id)
        })
        .await?;
    Ok(Json(ApiResponse::success(events)))
}

/// GET /api/stats/users
pub async fn users(
    State(state): State<AppState>,
    _auth: Authenticated,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<UserActivity>>>, ApiError> {
    let Query(params) = params?;
    let window = resolve_window(&state, &params)?;

    let (sessions, events) = state
        .with_db(move |db| Ok((db.sessions_in_range(&window)?, db.fetch_events_in_range(&window)?)))
        .await?;
    Ok(Json(ApiResponse::success(user_activity(&sessions, &events))))
}

/// GET /api/stats/overview
pub async fn overview(
    State(state): State<AppState>,
    _auth: Authenticated,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Overview>>, ApiError> {
    let Query(params) = params?;
    let window = resolve_window(&state, &params)?;

    let (sessions, events) = state
        .with_db(move |db| Ok((db.sessions_in_range(&window)?, db.fetch_events_in_range(&window)?)))
        .await?;
    Ok(Json(ApiResponse::success(compute_overview(&sessions, &events))))
}
