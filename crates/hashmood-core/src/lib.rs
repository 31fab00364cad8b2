//! Configuration for the hashmood sentiment bot.
//!
//! Two sources feed the process: the YAML bot config file (topic term and
//! credentials, strict schema, hot-reloadable) and runtime settings read
//! from the environment.

pub mod app_config;
pub mod bot_config;
pub mod config;
pub mod shared;

use thiserror::Error;

pub use app_config::AppConfig;
pub use bot_config::{load_bot_config, parse_bot_config, BotConfig, TwitterCredentials};
pub use config::load_app_config_from_env;
pub use shared::SharedConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    ConfigFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ConfigFileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
