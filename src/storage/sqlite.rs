//! Shared SQLite handle for the observation log and the currency configuration.

use crate::error::{FeedError, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A single SQLite connection shared by every store.
///
/// Statements run on tokio's blocking pool; the mutex serializes them, so each
/// store call sees a consistent connection without cross-call atomicity.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            FeedError::Storage(format!("failed to open {}: {}", path.display(), e))
        })?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        create_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking thread pool.
    pub(crate) async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| FeedError::Storage("connection mutex poisoned".to_string()))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| FeedError::Storage(format!("storage task failed: {}", e)))?
    }
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS currency_values (
            currency TEXT NOT NULL,
            rate TEXT NOT NULL,
            date TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS currency_configs (
            currency TEXT PRIMARY KEY
        );",
    )
    .map_err(|e| FeedError::Storage(format!("failed to create tables: {}", e)))
}
