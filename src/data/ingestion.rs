use super::currency::CurrencyCode;
use crate::error::{FeedError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, warn};

/// The normalized content of one feed download.
///
/// Every rate in the batch shares the single reference date the feed reported.
/// Rates are kept in feed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedBatch {
    pub date: NaiveDate,
    pub rates: Vec<(CurrencyCode, Decimal)>,
}

/// A remote source of reference exchange rates.
///
/// Implementations perform a single read with no retry; the caller owns the
/// retry and timeout policy.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Downloads and decodes the current feed.
    ///
    /// # Errors
    /// - `FeedError::UpstreamUnavailable` on network or HTTP status errors
    /// - `FeedError::MalformedFeed` if the body lacks the expected structure
    async fn fetch(&self) -> Result<FeedBatch>;
}

// Only the nodes the pipeline needs; everything else in the document is ignored.
#[derive(Debug, Deserialize)]
struct DataSet {
    #[serde(rename = "Body")]
    body: Body,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(rename = "Cube", default)]
    cubes: Vec<Cube>,
}

#[derive(Debug, Deserialize)]
struct Cube {
    date: Option<String>,
    #[serde(rename = "Rate", default)]
    rates: Vec<RateNode>,
}

#[derive(Debug, Deserialize)]
struct RateNode {
    currency: Option<String>,
    #[serde(rename = "$value")]
    value: Option<String>,
}

/// Decodes a National Bank of Romania reference-rate document.
///
/// The expected shape is `DataSet/Body/Cube[@date]/Rate[@currency]`, with the rate
/// as the text of each `Rate` element. Only the first `Cube` is read; the daily feed
/// carries exactly one.
///
/// # Errors
/// Returns `FeedError::MalformedFeed` if the XML cannot be decoded, there is no
/// `Cube`, or any date, currency or rate is missing or unparsable. A `Rate` whose
/// currency is present but not a three-letter code is skipped with a warning.
pub fn parse_feed(xml: &str) -> Result<FeedBatch> {
    let dataset: DataSet = serde_xml_rs::from_str(xml)
        .map_err(|e| FeedError::MalformedFeed(format!("undecodable document: {}", e)))?;

    let cube = dataset
        .body
        .cubes
        .into_iter()
        .next()
        .ok_or_else(|| FeedError::MalformedFeed("no Cube element in Body".to_string()))?;

    let raw_date = cube
        .date
        .ok_or_else(|| FeedError::MalformedFeed("Cube has no date attribute".to_string()))?;
    let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d").map_err(|e| {
        FeedError::MalformedFeed(format!("invalid Cube date `{}`: {}", raw_date, e))
    })?;

    let mut rates = Vec::with_capacity(cube.rates.len());
    for node in cube.rates {
        let raw_currency = node.currency.ok_or_else(|| {
            FeedError::MalformedFeed("Rate has no currency attribute".to_string())
        })?;
        let currency = match CurrencyCode::parse(&raw_currency) {
            Ok(currency) => currency,
            Err(_) => {
                warn!(currency = %raw_currency, date = %date, "skipping rate with unusable currency code");
                continue;
            }
        };

        let raw_rate = node.value.ok_or_else(|| {
            FeedError::MalformedFeed(format!("Rate for {} has no value", currency))
        })?;
        let rate = Decimal::from_str(raw_rate.trim()).map_err(|e| {
            FeedError::MalformedFeed(format!(
                "invalid rate `{}` for {}: {}",
                raw_rate, currency, e
            ))
        })?;

        rates.push((currency, rate));
    }

    Ok(FeedBatch { date, rates })
}

/// HTTP client for the National Bank of Romania daily reference-rate feed.
pub struct BnrFeed {
    url: String,
    client: reqwest::Client,
}

impl BnrFeed {
    /// Creates a feed client for the given document URL.
    ///
    /// # Arguments
    /// * `url`: Location of the XML document, normally `https://www.bnr.ro/nbrfxrates.xml`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RateSource for BnrFeed {
    async fn fetch(&self) -> Result<FeedBatch> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| FeedError::UpstreamUnavailable(e.to_string()))?
            .text()
            .await
            .map_err(|e| FeedError::UpstreamUnavailable(e.to_string()))?;

        let batch = parse_feed(&body)?;
        debug!(date = %batch.date, rates = batch.rates.len(), url = %self.url, "fetched rate feed");
        Ok(batch)
    }
}
