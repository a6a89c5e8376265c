//! In-process stores for exercising the pipeline and the API without SQLite.

use super::{CurrencyConfigStore, ObservationStore};
use crate::data::{CurrencyCode, Observation};
use crate::error::{FeedError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// Observation log that can be told to fail after a number of rows.
#[derive(Default)]
pub struct InMemoryObservationStore {
    rows: Mutex<Vec<Observation>>,
    fail_after: Mutex<Option<usize>>,
}

impl InMemoryObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write past the first `rows` total rows fails.
    pub fn fail_after(&self, rows: usize) {
        *self.fail_after.lock().unwrap() = Some(rows);
    }

    pub fn rows(&self) -> Vec<Observation> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObservationStore for InMemoryObservationStore {
    async fn append_batch(&self, date: NaiveDate, rates: &[(CurrencyCode, Decimal)]) -> Result<()> {
        let limit = *self.fail_after.lock().unwrap();
        let mut rows = self.rows.lock().unwrap();
        for (currency, rate) in rates {
            if limit.map_or(false, |limit| rows.len() >= limit) {
                return Err(FeedError::StorageWriteFailure(format!("{} on {}", currency, date)));
            }
            rows.push(Observation {
                currency: currency.clone(),
                rate: *rate,
                date,
            });
        }
        Ok(())
    }

    async fn all_rows(&self) -> Result<Vec<Observation>> {
        Ok(self.rows())
    }
}

#[derive(Default)]
pub struct InMemoryCurrencyConfigStore {
    codes: Mutex<BTreeSet<CurrencyCode>>,
}

impl InMemoryCurrencyConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CurrencyConfigStore for InMemoryCurrencyConfigStore {
    async fn replace(&self, codes: BTreeSet<CurrencyCode>) -> Result<()> {
        *self.codes.lock().unwrap() = codes;
        Ok(())
    }

    async fn current(&self) -> Result<BTreeSet<CurrencyCode>> {
        Ok(self.codes.lock().unwrap().clone())
    }
}
