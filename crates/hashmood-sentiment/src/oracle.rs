//! Sentiment scoring service client.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::SentimentError;

const DEFAULT_BASE_URL: &str = "https://language.googleapis.com/";

/// Something that turns a piece of text into a document-level score.
pub trait SentimentOracle: Send + Sync {
    /// Score `text`, conventionally in `[-1.0, 1.0]`.
    fn score(&self, text: &str) -> impl Future<Output = Result<f64, SentimentError>> + Send;
}

/// Credentials file for the Natural Language API.
#[derive(Clone, Deserialize)]
pub struct GoogleCredentials {
    pub api_key: String,
}

impl std::fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCredentials")
            .field("api_key", &"[redacted]")
            .finish()
    }
}

impl GoogleCredentials {
    /// Read credentials from a JSON file of the form `{"api_key": "..."}`.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Io`] if the file cannot be read,
    /// [`SentimentError::Serialize`] if it is not valid JSON, or
    /// [`SentimentError::Oracle`] if the key is empty.
    pub fn from_file(path: &Path) -> Result<Self, SentimentError> {
        let raw = std::fs::read_to_string(path)?;
        let creds: Self = serde_json::from_str(&raw)?;
        if creds.api_key.trim().is_empty() {
            return Err(SentimentError::Oracle(format!(
                "empty api_key in {}",
                path.display()
            )));
        }
        Ok(creds)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeSentimentRequest<'a> {
    document: Document<'a>,
    encoding_type: &'static str,
}

#[derive(Serialize)]
struct Document<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeSentimentResponse {
    document_sentiment: Option<DocumentSentiment>,
}

#[derive(Deserialize)]
struct DocumentSentiment {
    // proto3 JSON omits zero values, so a neutral document has no score.
    #[serde(default)]
    score: f64,
}

/// Natural Language API client.
///
/// Holds one `reqwest::Client`, so connections are reused across calls.
#[derive(Debug, Clone)]
pub struct GoogleLanguageClient {
    client: Client,
    endpoint: Url,
}

impl GoogleLanguageClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the HTTP client cannot be built.
    pub fn new(credentials: &GoogleCredentials, timeout_secs: u64) -> Result<Self, SentimentError> {
        Self::with_base_url(credentials, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the HTTP client cannot be built,
    /// or [`SentimentError::Oracle`] if `base_url` is not a valid URL.
    pub fn with_base_url(
        credentials: &GoogleCredentials,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SentimentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let mut endpoint = Url::parse(&normalised)
            .and_then(|u| u.join("v1/documents:analyzeSentiment"))
            .map_err(|e| SentimentError::Oracle(format!("invalid base URL '{base_url}': {e}")))?;
        endpoint
            .query_pairs_mut()
            .append_pair("key", &credentials.api_key);

        Ok(Self { client, endpoint })
    }

    async fn analyze(&self, text: &str) -> Result<f64, SentimentError> {
        let body = serde_json::to_vec(&AnalyzeSentimentRequest {
            document: Document {
                kind: "PLAIN_TEXT",
                content: text,
            },
            encoding_type: "UTF8",
        })?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SentimentError::Oracle(format!(
                "analyzeSentiment returned status {status}: {detail}"
            )));
        }

        let parsed: AnalyzeSentimentResponse = response
            .json()
            .await
            .map_err(|e| SentimentError::Oracle(format!("response parse error: {e}")))?;

        let sentiment = parsed.document_sentiment.ok_or_else(|| {
            SentimentError::Oracle("response has no documentSentiment".to_owned())
        })?;

        if sentiment.score >= 0.0 {
            tracing::debug!(score = sentiment.score, "sentiment: positive");
        } else {
            tracing::debug!(score = sentiment.score, "sentiment: negative");
        }
        Ok(sentiment.score)
    }
}

impl SentimentOracle for GoogleLanguageClient {
    fn score(&self, text: &str) -> impl Future<Output = Result<f64, SentimentError>> + Send {
        self.analyze(text)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn creds() -> GoogleCredentials {
        GoogleCredentials {
            api_key: "test-key".to_owned(),
        }
    }

    fn client(server: &MockServer) -> GoogleLanguageClient {
        GoogleLanguageClient::with_base_url(&creds(), 5, &server.uri())
            .expect("client construction should not fail")
    }

    #[tokio::test]
    async fn score_sends_plain_text_utf8_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/documents:analyzeSentiment"))
            .and(query_param("key", "test-key"))
            .and(header("content-type", "application/json; charset=utf-8"))
            .and(body_json(serde_json::json!({
                "document": { "type": "PLAIN_TEXT", "content": "Rust is great" },
                "encodingType": "UTF8"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "documentSentiment": { "magnitude": 0.9, "score": 0.8 },
                "language": "en",
                "sentences": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let score = client(&server).score("Rust is great").await.expect("score");
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn omitted_score_means_neutral() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "documentSentiment": { "magnitude": 0.1 }
            })))
            .mount(&server)
            .await;

        let score = client(&server).score("meh").await.expect("score");
        assert_eq!(score, 0.0);
    }

    #[tokio::test]
    async fn missing_document_sentiment_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "language": "en"
            })))
            .mount(&server)
            .await;

        let err = client(&server).score("text").await.unwrap_err();
        assert!(matches!(err, SentimentError::Oracle(_)), "{err:?}");
    }

    #[tokio::test]
    async fn service_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let err = client(&server).score("text").await.unwrap_err();
        assert!(err.to_string().contains("403"), "{err}");
    }

    #[test]
    fn credentials_load_from_json_file() {
        let path = std::env::temp_dir().join(format!("hashmood-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"api_key": "abc"}"#).unwrap();
        let creds = GoogleCredentials::from_file(&path).expect("creds");
        assert_eq!(creds.api_key, "abc");
        assert!(!format!("{creds:?}").contains("abc"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let path = std::env::temp_dir().join(format!("hashmood-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"api_key": ""}"#).unwrap();
        assert!(GoogleCredentials::from_file(&path).is_err());
        std::fs::remove_file(&path).ok();
    }
}
