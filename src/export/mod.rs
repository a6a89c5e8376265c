pub mod drive;
pub mod local;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

pub use drive::DriveSink;
pub use local::LocalDirSink;

/// Identifier the sink assigned to an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileId(pub String);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Destination for exported snapshots.
///
/// Every call creates a new object, even when `name` repeats; sinks never
/// overwrite or dedupe.
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Uploads `content` as a blob called `name`.
    ///
    /// # Errors
    /// Returns `FeedError::SinkUnavailable` on auth, network or quota failures.
    async fn upload(&self, name: &str, content: Vec<u8>) -> Result<FileId>;
}
