use super::sqlite::Database;
use crate::data::CurrencyCode;
use crate::error::{FeedError, Result};
use async_trait::async_trait;
use rusqlite::params;
use std::collections::BTreeSet;

/// The set of currencies the scheduled cycle keeps.
///
/// Replacement is wholesale; the previous set is not retained anywhere.
#[async_trait]
pub trait CurrencyConfigStore: Send + Sync {
    /// Atomically swaps the active configuration for `codes`.
    async fn replace(&self, codes: BTreeSet<CurrencyCode>) -> Result<()>;

    /// The active configuration, empty if nothing was ever configured.
    async fn current(&self) -> Result<BTreeSet<CurrencyCode>>;
}

/// Configuration kept in the `currency_configs` table so it survives restarts.
#[derive(Clone)]
pub struct SqliteCurrencyConfigStore {
    db: Database,
}

impl SqliteCurrencyConfigStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CurrencyConfigStore for SqliteCurrencyConfigStore {
    async fn replace(&self, codes: BTreeSet<CurrencyCode>) -> Result<()> {
        self.db
            .with_conn(move |conn| {
                let write_err = |e: rusqlite::Error| FeedError::StorageWriteFailure(e.to_string());
                let tx = conn.transaction().map_err(write_err)?;
                tx.execute("DELETE FROM currency_configs", [])
                    .map_err(write_err)?;
                for code in &codes {
                    tx.execute(
                        "INSERT INTO currency_configs (currency) VALUES (?1)",
                        params![code.as_str()],
                    )
                    .map_err(write_err)?;
                }
                tx.commit().map_err(write_err)
            })
            .await
    }

    async fn current(&self) -> Result<BTreeSet<CurrencyCode>> {
        self.db
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT currency FROM currency_configs")?;
                let raw = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                raw.iter()
                    .map(|code| {
                        CurrencyCode::parse(code).map_err(|_| {
                            FeedError::Storage(format!("corrupt configured currency `{}`", code))
                        })
                    })
                    .collect()
            })
            .await
    }
}
