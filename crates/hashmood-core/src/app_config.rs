use std::path::PathBuf;

/// Runtime settings read from the environment at startup.
///
/// Unlike [`crate::BotConfig`], these are never reloaded.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub output_path: PathBuf,
    pub templates_dir: PathBuf,
    pub target_lang: String,
    pub report_interval_secs: u64,
    pub stream_buffer: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}
