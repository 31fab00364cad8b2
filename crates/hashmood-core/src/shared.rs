//! Hot-reloadable holder for the bot configuration.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::bot_config::{load_bot_config, BotConfig};
use crate::ConfigError;

/// Read-write guarded bot configuration.
///
/// Readers take cheap `Arc` snapshots; [`SharedConfig::reload`] parses the
/// new file completely before swapping, so a bad file never replaces a
/// good config.
#[derive(Debug)]
pub struct SharedConfig {
    inner: RwLock<Arc<BotConfig>>,
}

impl SharedConfig {
    #[must_use]
    pub fn new(config: BotConfig) -> Self {
        Self {
            inner: RwLock::new(Arc::new(config)),
        }
    }

    /// Load the initial configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be loaded or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::new(load_bot_config(path)?))
    }

    /// Re-read `path` and swap it in.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the new file is invalid; the previous
    /// configuration stays active.
    pub fn reload(&self, path: &Path) -> Result<(), ConfigError> {
        let config = Arc::new(load_bot_config(path)?);
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = config;
        Ok(())
    }

    /// Current configuration.
    #[must_use]
    pub fn snapshot(&self) -> Arc<BotConfig> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }
}
