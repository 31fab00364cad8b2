use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ConfigError;

/// The bot configuration file.
///
/// Unknown keys anywhere in the document are rejected at parse time.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Topic filter term used for the stream subscription, e.g. `#rustlang`.
    pub target_hashtag: String,
    pub twitter_credentials: TwitterCredentials,
    /// Path to the JSON credentials file for the sentiment service.
    #[serde(rename = "google_app_credentials_file")]
    pub google_credentials_file: PathBuf,
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TwitterCredentials {
    #[serde(rename = "twitter_consumer_key")]
    pub consumer_key: String,
    #[serde(rename = "twitter_consumer_secret")]
    pub consumer_secret: String,
    /// User-context token used to publish status posts.
    #[serde(rename = "twitter_access_token")]
    pub access_token: String,
    /// Secret paired with `access_token` for OAuth 1.0a signing.
    #[serde(rename = "twitter_access_token_secret")]
    pub access_token_secret: String,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("target_hashtag", &self.target_hashtag)
            .field("twitter_credentials", &self.twitter_credentials)
            .field("google_credentials_file", &self.google_credentials_file)
            .finish()
    }
}

impl std::fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("consumer_key", &"[redacted]")
            .field("consumer_secret", &"[redacted]")
            .field("access_token", &"[redacted]")
            .field("access_token_secret", &"[redacted]")
            .finish()
    }
}

/// Load and validate the bot configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, contains unknown or
/// missing keys, or fails validation.
pub fn load_bot_config(path: &Path) -> Result<BotConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_bot_config(&content)
}

/// Parse and validate a bot configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::ConfigFileParse`] for malformed YAML, unknown keys
/// or missing keys, and [`ConfigError::Validation`] for empty values.
pub fn parse_bot_config(content: &str) -> Result<BotConfig, ConfigError> {
    let config: BotConfig = serde_yaml::from_str(content)?;
    validate_bot_config(&config)?;
    Ok(config)
}

fn validate_bot_config(config: &BotConfig) -> Result<(), ConfigError> {
    let mut empty = Vec::new();

    if config.target_hashtag.trim().is_empty() {
        empty.push("target_hashtag");
    }
    let creds = &config.twitter_credentials;
    if creds.consumer_key.trim().is_empty() {
        empty.push("twitter_credentials.twitter_consumer_key");
    }
    if creds.consumer_secret.trim().is_empty() {
        empty.push("twitter_credentials.twitter_consumer_secret");
    }
    if creds.access_token.trim().is_empty() {
        empty.push("twitter_credentials.twitter_access_token");
    }
    if creds.access_token_secret.trim().is_empty() {
        empty.push("twitter_credentials.twitter_access_token_secret");
    }
    if config.google_credentials_file.as_os_str().is_empty() {
        empty.push("google_app_credentials_file");
    }

    if !empty.is_empty() {
        return Err(ConfigError::Validation(format!(
            "empty values for: {}",
            empty.join(", ")
        )));
    }

    Ok(())
}
