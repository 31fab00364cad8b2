//! Twitter API v2 adapter for hashmood.
//!
//! Opens the filtered stream for the topic term, turns stream lines into
//! [`hashmood_sentiment::StreamItem`]s and posts status reports.

pub mod client;
pub mod error;
mod oauth1;
pub mod stream;
mod types;

pub use client::TwitterClient;
pub use error::TwitterError;
pub use stream::TweetStream;
