//! Retry with exponential back-off and jitter.
//!
//! Used for report publication and stream reconnects. Oracle calls are never
//! retried: a failed score drops that one message.

use std::future::Future;
use std::time::Duration;

use crate::error::SentimentError;

/// How many extra attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
        }
    }

    /// No retries, no delay.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Jittered delay before retry number `attempt` (1-based).
    ///
    /// `base × 2^(attempt-1)` capped at 60 s, then scaled by a random
    /// factor in `[0.75, 1.25)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        const MAX_DELAY_MS: u64 = 60_000;
        let computed = self
            .backoff_base_ms
            .saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
        let capped = computed.min(MAX_DELAY_MS);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
        Duration::from_millis(delay_ms)
    }
}

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, HTTP 5xx and 429, and
/// stream or publish errors flagged retriable by the adapter.
///
/// **Not retriable:** service-level rejections, malformed responses, local
/// I/O and encoding failures.
#[must_use]
pub fn is_retriable(err: &SentimentError) -> bool {
    match err {
        SentimentError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status()
                    .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
        }
        SentimentError::Stream { retriable, .. } | SentimentError::Publish { retriable, .. } => {
            *retriable
        }
        SentimentError::Oracle(_) | SentimentError::Io(_) | SentimentError::Serialize(_) => false,
    }
}

/// Runs `operation` with up to `policy.max_retries` additional attempts on
/// transient errors. Non-retriable errors are returned immediately.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// non-retriable error.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, SentimentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SentimentError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    what,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
