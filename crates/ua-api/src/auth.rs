//! Bearer-token authentication for dashboard routes.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// A freshly issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Checks credentials and tracks issued tokens.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Result<IssuedToken, ApiError>;

    /// Returns true if `token` was issued and has not expired or been revoked.
    fn verify(&self, token: &str) -> bool;

    /// Revokes `token`. Returns false if it was not active.
    fn revoke(&self, token: &str) -> bool;
}

/// A single username/password pair from configuration.
pub struct StaticCredentials {
    username: String,
    password: Option<String>,
    ttl: Duration,
    tokens: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl StaticCredentials {
    pub fn new(config: &AuthConfig) -> Self {
        if config.password.is_none() {
            tracing::warn!("auth.password is not set; dashboard login is disabled");
        }
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            ttl: Duration::minutes(i64::from(config.token_ttl_minutes)),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    fn authenticate_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, ApiError> {
        let Some(expected) = self.password.as_deref() else {
            return Err(ApiError::InvalidCredentials);
        };
        if username != self.username || password != expected {
            tracing::debug!(username, "rejected login");
            return Err(ApiError::InvalidCredentials);
        }

        let token = Uuid::new_v4().to_string();
        let expires_at = now + self.ttl;
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.retain(|_, expiry| *expiry > now);
        tokens.insert(token.clone(), expires_at);
        tracing::debug!(username, active = tokens.len(), "issued token");
        Ok(IssuedToken { token, expires_at })
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .is_some_and(|expiry| *expiry > now)
    }
}

impl Authenticator for StaticCredentials {
    fn authenticate(&self, username: &str, password: &str) -> Result<IssuedToken, ApiError> {
        self.authenticate_at(username, password, Utc::now())
    }

    fn verify(&self, token: &str) -> bool {
        self.verify_at(token, Utc::now())
    }

    fn revoke(&self, token: &str) -> bool {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }
}

/// Extractor that rejects requests without a valid bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub token: String,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        if state.auth().verify(token) {
            Ok(Self {
                token: token.to_string(),
            })
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
