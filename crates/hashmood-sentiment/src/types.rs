use serde::Serialize;

/// One message received from the upstream stream.
///
/// Lives only for a single processing step of the consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub text: String,
    /// Language tag assigned by the platform, e.g. `en`.
    pub lang: String,
    /// `true` when the message is a reshare of another message.
    pub is_reshare: bool,
    pub location: Option<String>,
    /// Creation timestamp in the platform's own string form.
    pub created_at: String,
}

/// An item read off the stream before the consumer's type check.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Event(RawEvent),
    /// A line that did not decode as a message (system notices, error
    /// payloads, unknown shapes). Carries a short description for logging.
    Unrecognized(String),
}

/// A persisted record of one scored message. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSample {
    #[serde(rename = "sentiment_analysis_score")]
    pub score: f64,
    #[serde(rename = "time_stamp")]
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Point-in-time view of the rolling aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AggregateSnapshot {
    /// `total / count`, or `0.0` before the first sample.
    pub average: f64,
    pub count: u64,
    pub total: f64,
}
