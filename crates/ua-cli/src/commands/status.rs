//! Status command for showing what the local database holds.

use std::io::Write;

use anyhow::Result;

use super::open_database;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let stats = db.stats()?;

    writeln!(writer, "Usage analytics status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Sessions: {}", stats.session_count)?;
    writeln!(writer, "Events: {}", stats.event_count)?;

    match stats.latest_event_at {
        Some(latest) => writeln!(writer, "Latest event: {latest}")?,
        None => writeln!(writer, "No events recorded.")?,
    }

    Ok(())
}
