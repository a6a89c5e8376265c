use super::auth::SessionStore;
use crate::data::{parse_codes, CurrencyCode, Observation, Snapshot};
use crate::error::{FeedError, Result};
use crate::pipeline::IngestionPipeline;
use crate::storage::{CurrencyConfigStore, ObservationStore};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Handles shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub currencies: Arc<dyn CurrencyConfigStore>,
    pub observations: Arc<dyn ObservationStore>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Replaces the currencies kept by scheduled ticks.
    ///
    /// Every code is validated before the store is touched, so a bad request
    /// leaves the previous configuration in place. Duplicates collapse. The new
    /// set applies from the next tick.
    pub async fn configure(&self, raw: &[String]) -> Result<BTreeSet<CurrencyCode>> {
        let codes = parse_codes(raw)?;
        self.currencies.replace(codes.clone()).await?;
        info!(currencies = ?codes, "currency configuration replaced");
        Ok(codes)
    }

    /// On-demand fetch for a date given as `YYYY-MM-DD`.
    pub async fn rates_for(&self, raw_date: &str) -> Result<Snapshot> {
        // chrono also accepts unpadded fields; the feed's own form is the only one served
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .ok()
            .filter(|date| date.format("%Y-%m-%d").to_string() == raw_date)
            .ok_or_else(|| FeedError::InvalidDate(raw_date.to_string()))?;
        self.pipeline.run_for_date(date).await
    }

    pub async fn analytics(&self) -> Result<Vec<Observation>> {
        self.observations.all_rows().await
    }
}
