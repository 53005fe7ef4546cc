//! HTTP surface for usage analytics.
//!
//! Client applications report sessions and events through unauthenticated
//! ingestion routes. The dashboard logs in for a bearer token and reads
//! session listings, per-user activity and inference latency statistics.
//!
//! Every response uses the [`ApiResponse`] envelope.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod state;

use std::future::Future;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use auth::{Authenticated, Authenticator, IssuedToken, StaticCredentials};
pub use config::{AuthConfig, ServerConfig, StatsConfig};
pub use error::ApiError;
pub use response::ApiResponse;
pub use state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Auth
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Ingestion
        .route("/api/sessions/start", post(handlers::ingest::start_session))
        .route("/api/sessions/end", post(handlers::ingest::end_session))
        .route("/api/events", post(handlers::ingest::record_event))
        .route("/api/events/batch", post(handlers::ingest::record_batch))
        // Dashboard
        .route("/api/sessions", get(handlers::stats::list_sessions))
        .route(
            "/api/sessions/{session_id}/events",
            get(handlers::stats::session_events),
        )
        .route(
            "/api/stats/inference-latency",
            get(handlers::stats::inference_latency),
        )
        .route("/api/stats/users", get(handlers::stats::users))
        .route("/api/stats/overview", get(handlers::stats::overview))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "usage analytics API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("server stopped");
    Ok(())
}
