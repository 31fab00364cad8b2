//! Stream subscription seams and the reader task.
//!
//! The reader owns the upstream subscription and forwards items into a
//! bounded queue. When the queue is full the item is dropped rather than
//! buffered. Remote disconnects are retried through the
//! [`StreamConnector`]; every exit path drops the subscription.

use std::future::Future;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::error::SentimentError;
use crate::retry::RetryPolicy;
use crate::types::StreamItem;

/// An open subscription yielding stream items until closed.
pub trait EventStream: Send {
    /// Next item, `None` once the remote side closed the stream.
    fn next_item(
        &mut self,
    ) -> impl Future<Output = Option<Result<StreamItem, SentimentError>>> + Send;
}

/// Opens filtered subscriptions for a topic term.
pub trait StreamConnector: Send + Sync {
    type Stream: EventStream;

    fn connect(
        &self,
        term: &str,
    ) -> impl Future<Output = Result<Self::Stream, SentimentError>> + Send;
}

/// Forward items from `stream` into `tx` until cancelled.
///
/// `stream` is the already established first subscription. On disconnect the
/// reader reconnects, sleeping with back-off between attempts. Each
/// disconnect gets one connect plus up to `policy.max_retries` retries, so it
/// gives up after `policy.max_retries + 1` consecutive failed connects.
///
/// Returns `Ok(())` on cancellation or when the consumer side hung up.
///
/// # Errors
///
/// Returns [`SentimentError::Stream`] once reconnects are exhausted, or the
/// first non-retriable connect error.
pub async fn run_reader<C: StreamConnector>(
    connector: &C,
    mut stream: C::Stream,
    term: &str,
    tx: mpsc::Sender<StreamItem>,
    policy: RetryPolicy,
    cancel: CancellationToken,
) -> Result<(), SentimentError> {
    let mut dropped: u64 = 0;

    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(dropped, "stream reader: shutdown requested");
                return Ok(());
            }
            next = stream.next_item() => next,
        };

        match next {
            Some(Ok(item)) => {
                match tx.try_send(item) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        dropped += 1;
                        tracing::warn!(dropped, "stream reader: consumer queue full, dropping item");
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::info!("stream reader: consumer gone, closing subscription");
                        return Ok(());
                    }
                }
                continue;
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "stream reader: subscription broke, reconnecting");
            }
            None => {
                tracing::warn!("stream reader: remote closed subscription, reconnecting");
            }
        }

        // The old subscription is dropped before dialing again.
        drop(stream);
        match reconnect(connector, term, policy, &cancel).await? {
            Some(next) => stream = next,
            None => {
                tracing::info!(dropped, "stream reader: shutdown requested while reconnecting");
                return Ok(());
            }
        }
    }
}

async fn reconnect<C: StreamConnector>(
    connector: &C,
    term: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Option<C::Stream>, SentimentError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let delay = policy.delay_for(attempt);
        tokio::select! {
            () = cancel.cancelled() => return Ok(None),
            () = tokio::time::sleep(delay) => {}
        }

        match connector.connect(term).await {
            Ok(stream) => {
                tracing::info!(attempt, term, "stream reader: reconnected");
                return Ok(Some(stream));
            }
            Err(e) if crate::retry::is_retriable(&e) && attempt <= policy.max_retries => {
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    error = %e,
                    "stream reader: reconnect failed"
                );
            }
            Err(e) => {
                tracing::error!(attempt, error = %e, "stream reader: giving up");
                return Err(e);
            }
        }
    }
}
