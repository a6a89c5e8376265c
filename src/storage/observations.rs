use super::sqlite::Database;
use crate::data::{CurrencyCode, Observation};
use crate::error::{FeedError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::params;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

/// Append-only log of historical rate observations.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Persists each `(currency, rate)` pair as one observation dated `date`.
    ///
    /// Rows are written independently. If a write fails, the rows before it stay
    /// persisted and `FeedError::StorageWriteFailure` is returned.
    async fn append_batch(&self, date: NaiveDate, rates: &[(CurrencyCode, Decimal)]) -> Result<()>;

    /// Every observation ever appended, in insertion order.
    async fn all_rows(&self) -> Result<Vec<Observation>>;
}

/// Observation log backed by the `currency_values` table.
#[derive(Clone)]
pub struct SqliteObservationStore {
    db: Database,
}

impl SqliteObservationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ObservationStore for SqliteObservationStore {
    async fn append_batch(&self, date: NaiveDate, rates: &[(CurrencyCode, Decimal)]) -> Result<()> {
        let rows = rates.to_vec();
        let count = rows.len();
        self.db
            .with_conn(move |conn| {
                let day = date.format("%Y-%m-%d").to_string();
                let mut stmt = conn
                    .prepare_cached("INSERT INTO currency_values (currency, rate, date) VALUES (?1, ?2, ?3)")
                    .map_err(|e| FeedError::StorageWriteFailure(e.to_string()))?;
                for (currency, rate) in &rows {
                    stmt.execute(params![currency.as_str(), rate.to_string(), day])
                        .map_err(|e| {
                            FeedError::StorageWriteFailure(format!("{} on {}: {}", currency, day, e))
                        })?;
                }
                Ok(())
            })
            .await?;
        debug!(%date, rows = count, "appended observations");
        Ok(())
    }

    async fn all_rows(&self) -> Result<Vec<Observation>> {
        self.db
            .with_conn(|conn| {
                let mut stmt =
                    conn.prepare("SELECT currency, rate, date FROM currency_values ORDER BY rowid")?;
                let raw = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                raw.into_iter()
                    .map(|(currency, rate, date)| decode_row(&currency, &rate, &date))
                    .collect()
            })
            .await
    }
}

fn decode_row(currency: &str, rate: &str, date: &str) -> Result<Observation> {
    let corrupt = |what: &str| FeedError::Storage(format!("corrupt observation row: {}", what));
    Ok(Observation {
        currency: CurrencyCode::parse(currency).map_err(|_| corrupt(currency))?,
        rate: Decimal::from_str(rate).map_err(|_| corrupt(rate))?,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| corrupt(date))?,
    })
}
