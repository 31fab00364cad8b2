use hashmood_sentiment::SentimentError;
use thiserror::Error;

/// Errors returned by the Twitter API client.
#[derive(Debug, Error)]
pub enum TwitterError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Twitter API returned {status} for {context}: {body}")]
    Api {
        context: String,
        status: u16,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{0}'")]
    BaseUrl(String),
}

impl TwitterError {
    /// Whether a later attempt could succeed without operator action.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            TwitterError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_body()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            TwitterError::Api { status, .. } => *status == 429 || *status >= 500,
            TwitterError::Deserialize { .. } | TwitterError::BaseUrl(_) => false,
        }
    }

    pub(crate) fn into_stream_error(self) -> SentimentError {
        SentimentError::Stream {
            retriable: self.is_transient(),
            message: self.to_string(),
        }
    }

    pub(crate) fn into_publish_error(self) -> SentimentError {
        SentimentError::Publish {
            retriable: self.is_transient(),
            message: self.to_string(),
        }
    }
}
