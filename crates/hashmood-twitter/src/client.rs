//! HTTP client for the Twitter API v2.
//!
//! Covers the three things hashmood needs: an app-only bearer token for the
//! filtered stream, keeping the stream rules pointed at the topic term, and
//! posting status updates signed with the user access token (OAuth 1.0a).

use std::time::Duration;

use hashmood_core::TwitterCredentials;
use hashmood_sentiment::{SentimentError, StatusPublisher, StreamConnector};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::TwitterError;
use crate::oauth1::OAuthKeys;
use crate::stream::TweetStream;
use crate::types::{
    AddRules, DeleteIds, DeleteRules, NewRule, PostTweet, PostTweetResponse, RulesResponse,
    TokenResponse,
};

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/";
const USER_AGENT: &str = "hashmood/0.1";
/// The stream sends a keep-alive newline every ~20s; a longer silence means
/// the connection has stalled.
const STREAM_READ_TIMEOUT_SECS: u64 = 30;

const TOKEN_PATH: &str = "oauth2/token";
const RULES_PATH: &str = "2/tweets/search/stream/rules";
const STREAM_PATH: &str = "2/tweets/search/stream";
const TWEETS_PATH: &str = "2/tweets";

/// Client for the Twitter API v2.
///
/// Use [`TwitterClient::new`] for production or
/// [`TwitterClient::with_base_url`] to point at a mock server in tests.
pub struct TwitterClient {
    client: Client,
    /// Same as `client` but with a per-read timeout instead of a
    /// whole-request one, since a stream response body never completes.
    stream_client: Client,
    keys: OAuthKeys,
    base_url: Url,
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl TwitterClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`TwitterError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(creds: &TwitterCredentials, timeout_secs: u64) -> Result<Self, TwitterError> {
        Self::with_base_url(creds, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`TwitterError::Http`] if a `reqwest::Client` cannot be
    /// constructed, or [`TwitterError::BaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        creds: &TwitterCredentials,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, TwitterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        let stream_client = build_stream_client(Duration::from_secs(STREAM_READ_TIMEOUT_SECS))?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| TwitterError::BaseUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            client,
            stream_client,
            keys: OAuthKeys {
                consumer_key: creds.consumer_key.clone(),
                consumer_secret: creds.consumer_secret.clone(),
                token: creds.access_token.clone(),
                token_secret: creds.access_token_secret.clone(),
            },
            base_url,
        })
    }

    /// Replaces the stream read timeout.
    ///
    /// A stream that delivers no bytes, not even a keep-alive, for this long
    /// ends with a retriable error and gets reconnected.
    ///
    /// # Errors
    ///
    /// Returns [`TwitterError::Http`] if the stream client cannot be rebuilt.
    pub fn with_stream_read_timeout(mut self, timeout: Duration) -> Result<Self, TwitterError> {
        self.stream_client = build_stream_client(timeout)?;
        Ok(self)
    }

    /// Exchanges the consumer key and secret for an app-only bearer token.
    ///
    /// # Errors
    ///
    /// - [`TwitterError::Api`] on a non-2xx status or a non-bearer token.
    /// - [`TwitterError::Http`] on network failure.
    /// - [`TwitterError::Deserialize`] if the body is not a token response.
    pub async fn app_token(&self) -> Result<String, TwitterError> {
        let response = self
            .client
            .post(self.url(TOKEN_PATH)?)
            .basic_auth(&self.keys.consumer_key, Some(&self.keys.consumer_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let token: TokenResponse =
            read_json(check_status(response, TOKEN_PATH).await?, TOKEN_PATH).await?;

        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(TwitterError::Api {
                context: TOKEN_PATH.to_owned(),
                status: 200,
                body: format!("unexpected token type '{}'", token.token_type),
            });
        }
        Ok(token.access_token)
    }

    /// Makes `term` the only filtered-stream rule.
    ///
    /// An existing rule with the same value is kept; every other rule is
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns any [`TwitterError`] from the rules endpoints.
    pub async fn sync_rules(&self, token: &str, term: &str) -> Result<(), TwitterError> {
        let url = self.url(RULES_PATH)?;

        let response = self.client.get(url.clone()).bearer_auth(token).send().await?;
        let existing: RulesResponse =
            read_json(check_status(response, "get rules").await?, "get rules").await?;

        let stale: Vec<&str> = existing
            .data
            .iter()
            .filter(|r| r.value != term)
            .map(|r| r.id.as_str())
            .collect();
        let has_term = existing.data.iter().any(|r| r.value == term);

        if !stale.is_empty() {
            tracing::info!(count = stale.len(), "twitter: deleting stale stream rules");
            let body = DeleteRules {
                delete: DeleteIds { ids: stale },
            };
            let response = self
                .client
                .post(url.clone())
                .bearer_auth(token)
                .json(&body)
                .send()
                .await?;
            check_status(response, "delete rules").await?;
        }

        if has_term {
            tracing::debug!(term, "twitter: stream rule already present");
        } else {
            let body = AddRules {
                add: vec![NewRule { value: term }],
            };
            let response = self
                .client
                .post(url)
                .bearer_auth(token)
                .json(&body)
                .send()
                .await?;
            check_status(response, "add rule").await?;
            tracing::info!(term, "twitter: stream rule added");
        }

        Ok(())
    }

    /// Opens the filtered stream for `term`.
    ///
    /// Fetches a fresh app token and syncs the rules before connecting.
    ///
    /// # Errors
    ///
    /// Returns any [`TwitterError`] from the token, rules or stream endpoints.
    pub async fn open_stream(&self, term: &str) -> Result<TweetStream, TwitterError> {
        let token = self.app_token().await?;
        self.sync_rules(&token, term).await?;

        let response = self
            .stream_client
            .get(self.url(STREAM_PATH)?)
            .bearer_auth(&token)
            .query(&[
                ("tweet.fields", "lang,created_at,referenced_tweets,geo"),
                ("expansions", "geo.place_id"),
                ("place.fields", "full_name"),
            ])
            .send()
            .await?;
        let response = check_status(response, "open stream").await?;

        tracing::info!(term, "twitter: filtered stream connected");
        Ok(TweetStream::new(response))
    }

    /// Posts `text` as a status update from the configured account.
    ///
    /// Returns the id of the new post.
    ///
    /// # Errors
    ///
    /// - [`TwitterError::Api`] if the API rejects the post.
    /// - [`TwitterError::Http`] on network failure.
    /// - [`TwitterError::Deserialize`] if the response body is unexpected.
    pub async fn post_status(&self, text: &str) -> Result<String, TwitterError> {
        let url = self.url(TWEETS_PATH)?;
        let authorization = self.keys.authorization("POST", url.as_str(), &[]);
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, authorization)
            .json(&PostTweet { text })
            .send()
            .await?;
        let posted: PostTweetResponse =
            read_json(check_status(response, "post tweet").await?, "post tweet").await?;

        tracing::info!(id = %posted.data.id, "twitter: status posted");
        Ok(posted.data.id)
    }

    fn url(&self, path: &str) -> Result<Url, TwitterError> {
        self.base_url
            .join(path)
            .map_err(|e| TwitterError::BaseUrl(format!("{}{path}: {e}", self.base_url)))
    }
}

fn build_stream_client(read_timeout: Duration) -> Result<Client, TwitterError> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .read_timeout(read_timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

async fn check_status(response: Response, context: &str) -> Result<Response, TwitterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TwitterError::Api {
        context: context.to_owned(),
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, TwitterError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| TwitterError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

impl StreamConnector for TwitterClient {
    type Stream = TweetStream;

    async fn connect(&self, term: &str) -> Result<TweetStream, SentimentError> {
        self.open_stream(term)
            .await
            .map_err(TwitterError::into_stream_error)
    }
}

impl StatusPublisher for TwitterClient {
    async fn publish(&self, status: &str) -> Result<(), SentimentError> {
        self.post_status(status)
            .await
            .map(drop)
            .map_err(TwitterError::into_publish_error)
    }
}
