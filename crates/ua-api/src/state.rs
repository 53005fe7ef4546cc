//! Shared state handed to every handler.

use std::sync::{Arc, Mutex};

use ua_db::{Database, DbError};

use crate::auth::Authenticator;
use crate::config::StatsConfig;
use crate::error::ApiError;

/// Database handle, authenticator and statistics defaults.
///
/// Cheap to clone; all clones share the same connection and token table.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
    auth: Arc<dyn Authenticator>,
    stats: StatsConfig,
}

impl AppState {
    pub fn new(db: Database, auth: impl Authenticator + 'static, stats: StatsConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            auth: Arc::new(auth),
            stats,
        }
    }

    pub fn auth(&self) -> &dyn Authenticator {
        self.auth.as_ref()
    }

    pub const fn stats(&self) -> StatsConfig {
        self.stats
    }

    /// Runs `f` against the database on the blocking pool.
    ///
    /// The lock is held only while `f` runs.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Database) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut db = db
                .lock()
                .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))?;
            f(&mut *db).map_err(ApiError::from)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("database task failed: {e}")))?
    }
}
