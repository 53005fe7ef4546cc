//! CLI subcommand implementations.

pub mod import;
pub mod latency;
pub mod serve;
pub mod status;
pub mod util;

use anyhow::{Context, Result};

use ua_db::Database;

use crate::Config;

/// Opens the configured database, creating its directory if needed.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}
