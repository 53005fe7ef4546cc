//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use ua_api::{AuthConfig, ServerConfig, StatsConfig};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("server", &self.server)
            .field("auth", &self.auth)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("ua.db"),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, the user config file, `config_path`,
    /// then `UA_*` environment variables (`UA_AUTH__PASSWORD` sets
    /// `auth.password`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("UA_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for ua.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ua"))
}

/// Returns the platform-specific data directory for ua.
///
/// On Linux: `~/.local/share/ua`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ua"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_ua() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "ua");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("ua.db"));
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.stats.default_window_days, 30);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ua.toml");
        std::fs::write(
            &path,
            r#"
database_path = "/srv/ua/events.db"

[server]
port = 9000

[auth]
password = "s3cret"
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/ua/events.db"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.auth.username, "admin");
        assert_eq!(config.auth.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = Config::default();
        config.auth.password = Some("s3cret".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
    }
}
