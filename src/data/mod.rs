pub mod currency;
pub mod ingestion;
pub mod snapshot;

pub use currency::{parse_codes, CurrencyCode};
pub use ingestion::{BnrFeed, FeedBatch, RateSource};
pub use snapshot::{Observation, Snapshot};
