//! The stream consumer: the single writer of the rolling aggregate.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::aggregate::RollingAggregate;
use crate::error::SentimentError;
use crate::normalize::normalize;
use crate::oracle::SentimentOracle;
use crate::sample_log::SampleLog;
use crate::types::{RawEvent, ScoredSample, StreamItem};

/// What happened to one stream item.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Scored, accumulated and logged.
    Accepted { score: f64, average: f64, count: u64 },
    Unrecognized,
    WrongLanguage,
    Reshare,
    /// The sentiment service failed; the message was dropped.
    OracleFailed,
}

/// Per-outcome counters over the consumer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub accepted: u64,
    pub unrecognized: u64,
    pub wrong_language: u64,
    pub reshares: u64,
    pub oracle_failures: u64,
}

impl ConsumerStats {
    /// Items that did not produce a sample, for any reason.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.unrecognized + self.wrong_language + self.reshares + self.oracle_failures
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Accepted { .. } => self.accepted += 1,
            Outcome::Unrecognized => self.unrecognized += 1,
            Outcome::WrongLanguage => self.wrong_language += 1,
            Outcome::Reshare => self.reshares += 1,
            Outcome::OracleFailed => self.oracle_failures += 1,
        }
    }
}

/// Processes stream items one at a time, in arrival order.
///
/// Each item is either fully handled (scored, accumulated, logged) or fully
/// dropped, so stopping between items never leaves partial state behind.
pub struct StreamConsumer<O, W> {
    oracle: O,
    aggregate: Arc<RollingAggregate>,
    log: SampleLog<W>,
    target_lang: String,
    stats: ConsumerStats,
}

impl<O, W> StreamConsumer<O, W>
where
    O: SentimentOracle,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(
        oracle: O,
        aggregate: Arc<RollingAggregate>,
        log: SampleLog<W>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            oracle,
            aggregate,
            log,
            target_lang: target_lang.into(),
            stats: ConsumerStats::default(),
        }
    }

    /// Consume `rx` until it closes or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns an error only when the sample log cannot be written; every
    /// other per-item failure is logged and the item dropped.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<StreamItem>,
        cancel: CancellationToken,
    ) -> Result<ConsumerStats, SentimentError> {
        tracing::info!(target_lang = %self.target_lang, "consumer: starting");
        loop {
            let item = tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("consumer: shutdown requested");
                    break;
                }
                item = rx.recv() => item,
            };
            let Some(item) = item else {
                tracing::warn!("consumer: stream closed");
                break;
            };
            self.process(item).await?;
        }

        tracing::info!(
            accepted = self.stats.accepted,
            unrecognized = self.stats.unrecognized,
            wrong_language = self.stats.wrong_language,
            reshares = self.stats.reshares,
            oracle_failures = self.stats.oracle_failures,
            "consumer: stopped"
        );
        Ok(self.stats)
    }

    /// Run one item through the filter, score, accumulate and log steps.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Io`] or [`SentimentError::Serialize`] if the
    /// sample cannot be appended to the log.
    pub async fn process(&mut self, item: StreamItem) -> Result<Outcome, SentimentError> {
        let outcome = match item {
            StreamItem::Unrecognized(kind) => {
                tracing::warn!(kind = %kind, "consumer: unexpected stream item, skipping");
                Outcome::Unrecognized
            }
            StreamItem::Event(event) => self.process_event(event).await?,
        };
        self.stats.record(&outcome);
        Ok(outcome)
    }

    async fn process_event(&mut self, event: RawEvent) -> Result<Outcome, SentimentError> {
        if event.lang != self.target_lang {
            tracing::debug!(lang = %event.lang, "consumer: wrong language, skipping");
            return Ok(Outcome::WrongLanguage);
        }
        if event.is_reshare {
            tracing::debug!("consumer: reshare, skipping");
            return Ok(Outcome::Reshare);
        }

        let text = normalize(&event.text);
        let score = match self.oracle.score(&text).await {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!(error = %e, "consumer: scoring failed, dropping message");
                return Ok(Outcome::OracleFailed);
            }
        };

        let snapshot = self.aggregate.accumulate(score);
        tracing::info!(
            score,
            average = snapshot.average,
            count = snapshot.count,
            total = snapshot.total,
            "consumer: sample accumulated"
        );

        self.log
            .append(&ScoredSample {
                score,
                timestamp: event.created_at,
                location: event.location,
            })
            .await?;

        Ok(Outcome::Accepted {
            score,
            average: snapshot.average,
            count: snapshot.count,
        })
    }

    #[must_use]
    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    pub fn into_log(self) -> SampleLog<W> {
        self.log
    }
}
