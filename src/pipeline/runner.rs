use crate::data::{FeedBatch, RateSource, Snapshot};
use crate::error::{FeedError, Result};
use crate::export::{ExportSink, FileId};
use crate::storage::{CurrencyConfigStore, ObservationStore};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Knobs for one pipeline instance.
///
/// # Fields
/// * `fetch_timeout`: Upper bound on a feed download; exceeding it counts as `UpstreamUnavailable`
/// * `upload_timeout`: Upper bound on an export upload; exceeding it counts as `SinkUnavailable`
/// * `export_name`: Name given to every exported blob
/// * `scratch_path`: Local copy of the last exported snapshot, overwritten on each tick
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub fetch_timeout: Duration,
    pub upload_timeout: Duration,
    pub export_name: String,
    pub scratch_path: PathBuf,
}

/// Result of a completed scheduled tick.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub date: NaiveDate,
    pub persisted: usize,
    pub file_id: FileId,
}

#[derive(Debug, Default)]
struct TickMetrics {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Point-in-time copy of the scheduled-tick counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickMetricsSnapshot {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub last_error: Option<String>,
}

/// Orchestrates ingestion runs: fetch, filter, persist, export.
///
/// Two entry points share the same collaborators but differ in policy:
/// - `run_for_date` persists and returns every currency in the feed and never exports
/// - `run_scheduled` keeps only the configured currencies and exports the result
///
/// The configuration is read once per scheduled run, so a concurrent replacement
/// may or may not be visible to a run already in flight.
pub struct IngestionPipeline {
    source: Arc<dyn RateSource>,
    currencies: Arc<dyn CurrencyConfigStore>,
    observations: Arc<dyn ObservationStore>,
    sink: Arc<dyn ExportSink>,
    settings: PipelineSettings,
    metrics: TickMetrics,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn RateSource>,
        currencies: Arc<dyn CurrencyConfigStore>,
        observations: Arc<dyn ObservationStore>,
        sink: Arc<dyn ExportSink>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            currencies,
            observations,
            sink,
            settings,
            metrics: TickMetrics::default(),
        }
    }

    async fn fetch(&self) -> Result<FeedBatch> {
        timeout(self.settings.fetch_timeout, self.source.fetch())
            .await
            .map_err(|_| {
                FeedError::UpstreamUnavailable(format!(
                    "no response within {:?}",
                    self.settings.fetch_timeout
                ))
            })?
    }

    /// Fetches the feed for `requested` and records every currency it contains.
    ///
    /// The currency configuration is not consulted and nothing is exported.
    ///
    /// # Errors
    /// - `FeedError::DateMismatch` if the feed is dated differently; nothing is written
    /// - `FeedError::UpstreamUnavailable` / `FeedError::MalformedFeed` from the fetch
    /// - `FeedError::StorageWriteFailure` if a row cannot be persisted
    pub async fn run_for_date(&self, requested: NaiveDate) -> Result<Snapshot> {
        let batch = self.fetch().await?;
        if batch.date != requested {
            return Err(FeedError::DateMismatch {
                requested,
                reported: batch.date,
            });
        }

        self.observations.append_batch(batch.date, &batch.rates).await?;

        let mut snapshot = Snapshot::new(batch.date);
        for (currency, rate) in batch.rates {
            snapshot.insert(currency, rate);
        }
        debug!(date = %snapshot.date, currencies = snapshot.len(), "on-demand fetch recorded");
        Ok(snapshot)
    }

    /// One scheduled cycle: fetch, keep configured currencies, persist, export.
    ///
    /// The snapshot is written to the scratch file before it is uploaded.
    pub async fn run_scheduled(&self) -> Result<TickOutcome> {
        let batch = self.fetch().await?;
        let wanted = self.currencies.current().await?;

        let kept: Vec<_> = batch
            .rates
            .into_iter()
            .filter(|(currency, _)| wanted.contains(currency))
            .collect();
        self.observations.append_batch(batch.date, &kept).await?;

        let mut snapshot = Snapshot::new(batch.date);
        for (currency, rate) in &kept {
            snapshot.insert(currency.clone(), *rate);
        }

        let bytes = snapshot
            .to_json_bytes()
            .map_err(|e| FeedError::SinkUnavailable(format!("failed to serialize snapshot: {}", e)))?;
        tokio::fs::write(&self.settings.scratch_path, &bytes)
            .await
            .map_err(|e| {
                FeedError::SinkUnavailable(format!(
                    "failed to write {}: {}",
                    self.settings.scratch_path.display(),
                    e
                ))
            })?;

        let file_id = timeout(
            self.settings.upload_timeout,
            self.sink.upload(&self.settings.export_name, bytes),
        )
        .await
        .map_err(|_| {
            FeedError::SinkUnavailable(format!(
                "upload did not finish within {:?}",
                self.settings.upload_timeout
            ))
        })??;

        Ok(TickOutcome {
            date: batch.date,
            persisted: kept.len(),
            file_id,
        })
    }

    /// Runs a scheduled cycle and absorbs its failure into logs and counters.
    pub async fn run_tick(&self) {
        self.metrics.started.fetch_add(1, Ordering::Relaxed);
        match self.run_scheduled().await {
            Ok(outcome) => {
                self.metrics.succeeded.fetch_add(1, Ordering::Relaxed);
                info!(
                    date = %outcome.date,
                    persisted = outcome.persisted,
                    file_id = %outcome.file_id,
                    "scheduled tick completed"
                );
            }
            Err(err) => {
                self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut last) = self.metrics.last_error.lock() {
                    *last = Some(err.to_string());
                }
                warn!(error = %err, "scheduled tick failed");
            }
        }
    }

    pub fn metrics(&self) -> TickMetricsSnapshot {
        TickMetricsSnapshot {
            started: self.metrics.started.load(Ordering::Relaxed),
            succeeded: self.metrics.succeeded.load(Ordering::Relaxed),
            failed: self.metrics.failed.load(Ordering::Relaxed),
            last_error: self
                .metrics
                .last_error
                .lock()
                .ok()
                .and_then(|last| last.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{parse_codes, CurrencyCode};
    use crate::pipeline::testing::{
        feed, settings, FixedSource, HangingSink, HangingSource, RecordingSink,
    };
    use crate::storage::memory::{InMemoryCurrencyConfigStore, InMemoryObservationStore};

    struct Harness {
        pipeline: IngestionPipeline,
        currencies: Arc<InMemoryCurrencyConfigStore>,
        observations: Arc<InMemoryObservationStore>,
        sink: Arc<RecordingSink>,
        _scratch: tempfile::TempDir,
    }

    fn harness(source: Arc<dyn RateSource>) -> Harness {
        let scratch = tempfile::tempdir().unwrap();
        let currencies = Arc::new(InMemoryCurrencyConfigStore::new());
        let observations = Arc::new(InMemoryObservationStore::new());
        let sink = Arc::new(RecordingSink::new());
        let pipeline = IngestionPipeline::new(
            source,
            currencies.clone(),
            observations.clone(),
            sink.clone(),
            settings(scratch.path()),
        );
        Harness {
            pipeline,
            currencies,
            observations,
            sink,
            _scratch: scratch,
        }
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn persisted(h: &Harness) -> Vec<(String, String, NaiveDate)> {
        h.observations
            .rows()
            .into_iter()
            .map(|o| (o.currency.to_string(), o.rate.to_string(), o.date))
            .collect()
    }

    #[tokio::test]
    async fn test_run_for_date_records_every_currency_regardless_of_config() {
        let h = harness(Arc::new(FixedSource::healthy(feed(
            "2024-01-10",
            &[("USD", "4.97"), ("EUR", "5.40"), ("GBP", "5.78")],
        ))));
        h.currencies.replace(parse_codes(["USD"]).unwrap()).await.unwrap();

        let snapshot = h.pipeline.run_for_date(day("2024-01-10")).await.unwrap();

        let names: Vec<&str> = snapshot.rates.keys().map(CurrencyCode::as_str).collect();
        assert_eq!(names, vec!["EUR", "GBP", "USD"]);
        assert_eq!(persisted(&h).len(), 3);
        assert!(h.sink.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_run_for_date_mismatch_writes_nothing() {
        let h = harness(Arc::new(FixedSource::healthy(feed(
            "2024-01-10",
            &[("USD", "4.97")],
        ))));

        let err = h.pipeline.run_for_date(day("2024-01-09")).await.unwrap_err();

        assert!(matches!(err, FeedError::DateMismatch { .. }));
        assert!(persisted(&h).is_empty());
    }

    #[tokio::test]
    async fn test_run_for_date_propagates_upstream_failure() {
        let h = harness(Arc::new(FixedSource::down()));
        let err = h.pipeline.run_for_date(day("2024-01-10")).await.unwrap_err();
        assert!(matches!(err, FeedError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_run_scheduled_keeps_only_configured_currencies() {
        let h = harness(Arc::new(FixedSource::healthy(feed(
            "2024-01-10",
            &[("USD", "4.97"), ("EUR", "5.40"), ("GBP", "5.78"), ("JPY", "3.17")],
        ))));
        h.currencies
            .replace(parse_codes(["USD", "EUR"]).unwrap())
            .await
            .unwrap();

        let outcome = h.pipeline.run_scheduled().await.unwrap();

        assert_eq!(outcome.persisted, 2);
        let mut names: Vec<String> = persisted(&h).into_iter().map(|(c, _, _)| c).collect();
        names.sort();
        assert_eq!(names, vec!["EUR", "USD"]);
    }

    #[tokio::test]
    async fn test_scheduled_end_to_end_exports_filtered_snapshot() {
        let h = harness(Arc::new(FixedSource::healthy(feed(
            "2024-01-10",
            &[("USD", "4.97"), ("EUR", "5.40")],
        ))));
        h.currencies.replace(parse_codes(["USD"]).unwrap()).await.unwrap();

        h.pipeline.run_tick().await;

        assert_eq!(
            persisted(&h),
            vec![("USD".to_string(), "4.97".to_string(), day("2024-01-10"))]
        );
        let uploads = h.sink.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "currencies.json");
        let blob: serde_json::Value = serde_json::from_slice(&uploads[0].1).unwrap();
        assert_eq!(blob, serde_json::json!({"USD": "4.97"}));

        let scratch = std::fs::read(&h.pipeline.settings.scratch_path).unwrap();
        assert_eq!(scratch, uploads[0].1);
        assert_eq!(h.pipeline.metrics().succeeded, 1);
    }

    #[tokio::test]
    async fn test_scheduled_with_empty_config_exports_empty_object() {
        let h = harness(Arc::new(FixedSource::healthy(feed(
            "2024-01-10",
            &[("USD", "4.97")],
        ))));

        let outcome = h.pipeline.run_scheduled().await.unwrap();

        assert_eq!(outcome.persisted, 0);
        assert_eq!(h.sink.uploads()[0].1, b"{}".to_vec());
    }

    #[tokio::test]
    async fn test_tick_failure_is_counted_not_raised() {
        let h = harness(Arc::new(FixedSource::down()));
        h.pipeline.run_tick().await;

        let metrics = h.pipeline.metrics();
        assert_eq!(metrics.started, 1);
        assert_eq!(metrics.failed, 1);
        assert!(metrics.last_error.unwrap().contains("unavailable"));
        assert!(h.sink.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_then_recovery() {
        let h = harness(Arc::new(FixedSource::healthy(feed(
            "2024-01-10",
            &[("USD", "4.97")],
        ))));
        h.currencies.replace(parse_codes(["USD"]).unwrap()).await.unwrap();
        h.sink.fail_next(1);

        h.pipeline.run_tick().await;
        h.pipeline.run_tick().await;

        let metrics = h.pipeline.metrics();
        assert_eq!((metrics.failed, metrics.succeeded), (1, 1));
        assert_eq!(h.sink.uploads().len(), 1);
        // rows from the failed tick stay persisted
        assert_eq!(persisted(&h).len(), 2);
    }

    #[tokio::test]
    async fn test_partial_batch_is_not_rolled_back() {
        let h = harness(Arc::new(FixedSource::healthy(feed(
            "2024-01-10",
            &[("USD", "4.97"), ("EUR", "5.40"), ("GBP", "5.78")],
        ))));
        h.observations.fail_after(2);

        let err = h.pipeline.run_for_date(day("2024-01-10")).await.unwrap_err();

        assert!(matches!(err, FeedError::StorageWriteFailure(_)));
        assert_eq!(persisted(&h).len(), 2);
    }

    #[tokio::test]
    async fn test_hanging_feed_times_out_as_upstream_unavailable() {
        let scratch = tempfile::tempdir().unwrap();
        let mut settings = settings(scratch.path());
        settings.fetch_timeout = Duration::from_millis(20);
        let pipeline = IngestionPipeline::new(
            Arc::new(HangingSource),
            Arc::new(InMemoryCurrencyConfigStore::new()),
            Arc::new(InMemoryObservationStore::new()),
            Arc::new(RecordingSink::new()),
            settings,
        );

        let err = pipeline.run_scheduled().await.unwrap_err();
        assert!(matches!(err, FeedError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_stalled_upload_fails_only_that_tick() {
        let scratch = tempfile::tempdir().unwrap();
        let source: Arc<dyn RateSource> = Arc::new(FixedSource::healthy(feed(
            "2024-01-10",
            &[("USD", "4.97"), ("EUR", "5.40")],
        )));
        let currencies = Arc::new(InMemoryCurrencyConfigStore::new());
        currencies.replace(parse_codes(["USD"]).unwrap()).await.unwrap();
        let observations = Arc::new(InMemoryObservationStore::new());

        let mut stalled_settings = settings(scratch.path());
        stalled_settings.upload_timeout = Duration::from_millis(20);
        let stalled = IngestionPipeline::new(
            Arc::clone(&source),
            currencies.clone(),
            observations.clone(),
            Arc::new(HangingSink),
            stalled_settings.clone(),
        );

        let err = stalled.run_scheduled().await.unwrap_err();
        assert!(matches!(err, FeedError::SinkUnavailable(_)));
        let rows = observations.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].currency.as_str(), "USD");

        // same stores, sink healthy again
        let sink = Arc::new(RecordingSink::new());
        let recovered = IngestionPipeline::new(
            source,
            currencies,
            observations.clone(),
            sink.clone(),
            stalled_settings,
        );
        recovered.run_tick().await;

        let metrics = recovered.metrics();
        assert_eq!((metrics.succeeded, metrics.failed), (1, 0));
        assert_eq!(sink.uploads().len(), 1);
        assert_eq!(observations.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_feed_aborts_tick_without_upload() {
        let h = harness(Arc::new(FixedSource::malformed()));
        h.currencies.replace(parse_codes(["USD"]).unwrap()).await.unwrap();

        h.pipeline.run_tick().await;

        let metrics = h.pipeline.metrics();
        assert_eq!((metrics.started, metrics.failed, metrics.succeeded), (1, 1, 0));
        assert!(metrics.last_error.unwrap().contains("malformed"));
        assert!(h.sink.uploads().is_empty());
        assert!(persisted(&h).is_empty());
    }
}
