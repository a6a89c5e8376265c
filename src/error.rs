use chrono::NaiveDate;
use thiserror::Error;

/// Failures surfaced by the ingestion pipeline and the stores behind it.
///
/// The on-demand path hands these straight to the HTTP caller; the scheduled
/// path only logs them and records them in the tick metrics.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("rate feed unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed rate feed: {0}")]
    MalformedFeed(String),

    #[error("feed is dated {reported}, requested {requested}")]
    DateMismatch {
        requested: NaiveDate,
        reported: NaiveDate,
    },

    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid currency configuration: {0}")]
    InvalidConfig(String),

    #[error("export sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("failed to persist observation: {0}")]
    StorageWriteFailure(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, FeedError>;

impl From<rusqlite::Error> for FeedError {
    fn from(err: rusqlite::Error) -> Self {
        FeedError::Storage(err.to_string())
    }
}
