use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use crate::auth::{Authenticated, IssuedToken};
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub revoked: bool,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<IssuedToken>>, ApiError> {
    let Json(request) = payload?;
    let issued = state
        .auth()
        .authenticate(&request.username, &request.password)?;
    Ok(Json(ApiResponse::success(issued)))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Json<ApiResponse<LogoutResponse>> {
    let revoked = state.auth().revoke(&auth.token);
    Json(ApiResponse::success(LogoutResponse { revoked }))
}
