use super::currency::CurrencyCode;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// One persisted historical fact: the rate of a currency on a given date.
///
/// Serializes as `{"currency": "USD", "rate": "4.97", "date": "2024-01-10"}`;
/// the rate keeps the textual precision the feed reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub currency: CurrencyCode,
    pub rate: Decimal,
    pub date: NaiveDate,
}

/// The currency → rate mapping produced by one pipeline run.
///
/// Never stored on its own; it is the export payload and the on-demand response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub rates: BTreeMap<CurrencyCode, Decimal>,
}

impl Snapshot {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            rates: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, currency: CurrencyCode, rate: Decimal) {
        self.rates.insert(currency, rate);
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Flat JSON object `{"USD": "4.97", ...}`, the format of the exported blob.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.rates)
    }
}
