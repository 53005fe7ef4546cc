//! Settings consumed by the HTTP layer.
//!
//! These sections are embedded in the CLI's figment-loaded configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Dashboard login settings.
///
/// Login is disabled while `password` is unset.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: Option<String>,
    pub token_ttl_minutes: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: None,
            token_ttl_minutes: 720,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Length of the window used when a request gives no start date.
    pub default_window_days: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            default_window_days: 30,
        }
    }
}
