//! Append-only newline-delimited JSON log of scored samples.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::SentimentError;
use crate::types::ScoredSample;

/// Writer for the sample log. Only the stream consumer writes to it.
#[derive(Debug)]
pub struct SampleLog<W> {
    writer: W,
    written: u64,
}

impl SampleLog<File> {
    /// Create (or truncate) the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Io`] if the file cannot be created.
    pub async fn create(path: &Path) -> Result<Self, SentimentError> {
        let file = File::create(path).await?;
        tracing::info!(path = %path.display(), "sample log created");
        Ok(Self::new(file))
    }
}

impl<W: AsyncWrite + Unpin> SampleLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Append one sample as a single JSON line and flush it.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Serialize`] or [`SentimentError::Io`].
    pub async fn append(&mut self, sample: &ScoredSample) -> Result<(), SentimentError> {
        let mut line = serde_json::to_vec(sample)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        self.written += 1;
        Ok(())
    }

    /// Number of samples appended so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
