//! Scripted collaborators for pipeline and API tests.

use crate::data::{CurrencyCode, FeedBatch, RateSource};
use crate::error::{FeedError, Result};
use crate::export::{ExportSink, FileId};
use crate::pipeline::PipelineSettings;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

pub fn feed(date: &str, rates: &[(&str, &str)]) -> FeedBatch {
    FeedBatch {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        rates: rates
            .iter()
            .map(|(c, r)| (CurrencyCode::parse(c).unwrap(), Decimal::from_str(r).unwrap()))
            .collect(),
    }
}

pub fn settings(scratch_dir: &Path) -> PipelineSettings {
    PipelineSettings {
        fetch_timeout: Duration::from_secs(5),
        upload_timeout: Duration::from_secs(5),
        export_name: "currencies.json".to_string(),
        scratch_path: scratch_dir.join("currencies.json"),
    }
}

enum Script {
    Healthy(FeedBatch),
    Down,
    Malformed,
}

/// Returns the same batch on every fetch, or fails every fetch the same way.
pub struct FixedSource(Script);

impl FixedSource {
    pub fn healthy(batch: FeedBatch) -> Self {
        Self(Script::Healthy(batch))
    }

    pub fn down() -> Self {
        Self(Script::Down)
    }

    pub fn malformed() -> Self {
        Self(Script::Malformed)
    }
}

#[async_trait]
impl RateSource for FixedSource {
    async fn fetch(&self) -> Result<FeedBatch> {
        match &self.0 {
            Script::Healthy(batch) => Ok(batch.clone()),
            Script::Down => Err(FeedError::UpstreamUnavailable("connection refused".to_string())),
            Script::Malformed => Err(FeedError::MalformedFeed("no Cube element in Body".to_string())),
        }
    }
}

/// Never answers.
pub struct HangingSource;

#[async_trait]
impl RateSource for HangingSource {
    async fn fetch(&self) -> Result<FeedBatch> {
        std::future::pending().await
    }
}

/// Keeps every successful upload; can be told to fail the next few calls.
#[derive(Default)]
pub struct RecordingSink {
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
    failures_left: Mutex<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, calls: usize) {
        *self.failures_left.lock().unwrap() = calls;
    }

    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExportSink for RecordingSink {
    async fn upload(&self, name: &str, content: Vec<u8>) -> Result<FileId> {
        {
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(FeedError::SinkUnavailable("quota exceeded".to_string()));
            }
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((name.to_string(), content));
        Ok(FileId(format!("file-{}", uploads.len())))
    }
}

/// Accepts the upload and never completes it.
pub struct HangingSink;

#[async_trait]
impl ExportSink for HangingSink {
    async fn upload(&self, _name: &str, _content: Vec<u8>) -> Result<FileId> {
        std::future::pending().await
    }
}
