use super::{ExportSink, FileId};
use crate::error::{FeedError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Sink that stores each blob as a new file in a local directory.
///
/// File names are prefixed with a fresh UUID so repeated uploads of the same
/// name accumulate instead of replacing each other.
pub struct LocalDirSink {
    dir: PathBuf,
}

impl LocalDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ExportSink for LocalDirSink {
    async fn upload(&self, name: &str, content: Vec<u8>) -> Result<FileId> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| FeedError::SinkUnavailable(format!("{}: {}", self.dir.display(), e)))?;

        let file_name = format!("{}-{}", uuid::Uuid::new_v4(), name);
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| FeedError::SinkUnavailable(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), "exported snapshot");
        Ok(FileId(file_name))
    }
}
