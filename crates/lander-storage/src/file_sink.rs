//! JSON-lines conversion sink.
//!
//! Appends one JSON object per line, in the data-store write contract shape.
//! The file is opened in append-only mode and never rewritten.
//!
//! # Thread safety
//!
//! A `tokio::sync::Mutex` around the file handle serializes writes. The
//! critical section is one `write_all` plus a flush.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::model::ConversionEvent;
use crate::{ConversionSink, StorageError};

/// Conversion sink that writes JSON-lines to a file.
pub struct FileConversionSink {
    path: PathBuf,
    writer: Mutex<Option<tokio::fs::File>>,
}

impl FileConversionSink {
    /// Create a sink writing to `path`.
    ///
    /// The file is created (or opened for append) lazily on the first event.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: Mutex::new(None),
        }
    }

    async fn get_writer(
        &self,
        page_id: &str,
    ) -> Result<tokio::sync::MutexGuard<'_, Option<tokio::fs::File>>, StorageError> {
        let mut guard = self.writer.lock().await;
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| StorageError::Write {
                    page_id: page_id.to_owned(),
                    reason: format!(
                        "failed to open conversion log '{}': {e}",
                        self.path.display()
                    ),
                })?;
            *guard = Some(file);
        }
        Ok(guard)
    }
}

#[async_trait::async_trait]
impl ConversionSink for FileConversionSink {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "file"
    }

    async fn record(&self, event: &ConversionEvent) -> Result<(), StorageError> {
        let mut line = serde_json::to_vec(event).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;
        line.push(b'\n');

        let write_err = |reason: String| StorageError::Write {
            page_id: event.page_id.clone(),
            reason,
        };

        let mut guard = self.get_writer(&event.page_id).await?;
        let file = guard
            .as_mut()
            .ok_or_else(|| write_err("file handle unexpectedly None after open".to_owned()))?;

        file.write_all(&line)
            .await
            .map_err(|e| write_err(format!("write failed: {e}")))?;
        file.flush()
            .await
            .map_err(|e| write_err(format!("flush failed: {e}")))?;

        Ok(())
    }
}

impl std::fmt::Debug for FileConversionSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConversionSink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
