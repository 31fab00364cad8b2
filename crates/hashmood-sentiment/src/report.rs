//! Periodic summary of the rolling aggregate.

use std::future::Future;
use std::sync::Arc;

use crate::aggregate::RollingAggregate;
use crate::error::SentimentError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::AggregateSnapshot;

/// Granularity the published average is rounded to.
pub const REPORT_ROUNDING_UNIT: f64 = 0.000_05;

/// An outbound channel for status text.
pub trait StatusPublisher: Send + Sync {
    fn publish(&self, status: &str) -> impl Future<Output = Result<(), SentimentError>> + Send;
}

impl<P: StatusPublisher> StatusPublisher for Arc<P> {
    fn publish(&self, status: &str) -> impl Future<Output = Result<(), SentimentError>> + Send {
        (**self).publish(status)
    }
}

/// Round `value` to the nearest multiple of `unit`, halves away from zero.
///
/// A non-positive or non-finite `unit` returns `value` unchanged.
#[must_use]
pub fn round_to_unit(value: f64, unit: f64) -> f64 {
    if !(unit.is_finite() && unit > 0.0) {
        return value;
    }
    // Adding 0.0 turns a rounded -0.0 into 0.0 so it prints unsigned.
    (value / unit).round() * unit + 0.0
}

/// Status text for one report.
#[must_use]
pub fn format_report(term: &str, snapshot: &AggregateSnapshot) -> String {
    let average = round_to_unit(snapshot.average, REPORT_ROUNDING_UNIT);
    format!(
        "Current Average Sentiment Analysis for {term}: {average:.5} for {count} samples",
        count = snapshot.count
    )
}

/// Reads the aggregate and publishes a summary. Holds no state between
/// ticks and never mutates the aggregate.
pub struct ReportEmitter<P> {
    publisher: P,
    aggregate: Arc<RollingAggregate>,
    term: String,
    retry: RetryPolicy,
}

impl<P: StatusPublisher> ReportEmitter<P> {
    pub fn new(
        publisher: P,
        aggregate: Arc<RollingAggregate>,
        term: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            publisher,
            aggregate,
            term: term.into(),
            retry,
        }
    }

    /// Publish one report, retrying transient failures.
    ///
    /// Returns the published text.
    ///
    /// # Errors
    ///
    /// Returns the publisher's error once retries are exhausted. Callers
    /// treat this as recoverable and try again on the next tick.
    pub async fn emit(&self) -> Result<String, SentimentError> {
        let snapshot = self.aggregate.snapshot();
        let status = format_report(&self.term, &snapshot);

        retry_with_backoff(self.retry, "publish report", || {
            self.publisher.publish(&status)
        })
        .await?;

        tracing::info!(
            average = snapshot.average,
            count = snapshot.count,
            "report: published"
        );
        Ok(status)
    }
}
