//! Streaming sentiment aggregation for hashmood.
//!
//! Stream items flow through the [`consumer::StreamConsumer`], which filters,
//! normalizes and scores each message, folds the score into the shared
//! [`aggregate::RollingAggregate`] and appends a [`types::ScoredSample`] to the
//! sample log. The [`report::ReportEmitter`] periodically publishes a summary
//! of the same aggregate.

pub mod aggregate;
pub mod consumer;
pub mod error;
pub mod normalize;
pub mod oracle;
pub mod report;
pub mod retry;
pub mod sample_log;
pub mod source;
pub mod types;

pub use aggregate::RollingAggregate;
pub use consumer::{ConsumerStats, Outcome, StreamConsumer};
pub use error::SentimentError;
pub use normalize::normalize;
pub use oracle::{GoogleCredentials, GoogleLanguageClient, SentimentOracle};
pub use report::{format_report, round_to_unit, ReportEmitter, StatusPublisher};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use sample_log::SampleLog;
pub use source::{run_reader, EventStream, StreamConnector};
pub use types::{AggregateSnapshot, RawEvent, ScoredSample, StreamItem};
