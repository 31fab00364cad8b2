use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The sentiment service rejected the request or answered with an
    /// unusable body.
    #[error("sentiment service error: {0}")]
    Oracle(String),

    /// The upstream subscription could not be opened or broke mid-read.
    #[error("stream error: {message}")]
    Stream { message: String, retriable: bool },

    #[error("publish error: {message}")]
    Publish { message: String, retriable: bool },

    #[error("sample log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sample encoding error: {0}")]
    Serialize(#[from] serde_json::Error),
}
