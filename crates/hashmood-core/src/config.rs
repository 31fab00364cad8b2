use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load runtime settings from environment variables already in the process.
///
/// Does not read `.env` files; the binary loads those once at startup.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build runtime settings using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let log_level = or_default("HASHMOOD_LOG_LEVEL", "info");
    let output_path = PathBuf::from(or_default("HASHMOOD_OUTPUT_PATH", "output.json"));
    let templates_dir = PathBuf::from(or_default("HASHMOOD_TEMPLATES_DIR", "templates"));

    let target_lang = or_default("HASHMOOD_TARGET_LANG", "en");
    if target_lang.trim().is_empty() {
        return Err(invalid("HASHMOOD_TARGET_LANG", "must not be empty".into()));
    }

    let report_interval_secs = parse_u64("HASHMOOD_REPORT_INTERVAL_SECS", "7200")?;
    if report_interval_secs == 0 {
        return Err(invalid(
            "HASHMOOD_REPORT_INTERVAL_SECS",
            "must be greater than zero".into(),
        ));
    }

    let stream_buffer = parse_usize("HASHMOOD_STREAM_BUFFER", "256")?;
    if stream_buffer == 0 {
        return Err(invalid(
            "HASHMOOD_STREAM_BUFFER",
            "must be greater than zero".into(),
        ));
    }

    let request_timeout_secs = parse_u64("HASHMOOD_REQUEST_TIMEOUT_SECS", "30")?;
    let max_retries = parse_u32("HASHMOOD_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("HASHMOOD_RETRY_BACKOFF_BASE_MS", "1000")?;

    Ok(AppConfig {
        log_level,
        output_path,
        templates_dir,
        target_lang: target_lang.trim().to_string(),
        report_interval_secs,
        stream_buffer,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
