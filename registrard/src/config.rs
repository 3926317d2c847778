use serde::Deserialize;
use std::path::{Path, PathBuf};

use registrar_common::{BridgeConfig, Error, LoggingConfig, Result, load_config};

/// Registry backend settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Adapter URI; the scheme selects the backend.
    pub uri: String,

    /// Max attempts to reach the backend at startup; -1 retries forever.
    pub retry_attempts: i32,

    /// Milliseconds between startup attempts.
    pub retry_interval_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            uri: "noop://".to_string(),
            retry_attempts: 0,
            retry_interval_ms: 2000,
        }
    }
}

/// Runtime source settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Path to the container fixture file served as the runtime.
    pub fixture: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fixture: PathBuf::from("containers.json"),
        }
    }
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub logging: LoggingConfig,
    pub bridge: BridgeConfig,
    pub registry: RegistryConfig,
    pub runtime: RuntimeConfig,

    /// Hostname embedded in minted service IDs; resolved from the system
    /// when empty.
    pub hostname: String,

    /// Seconds between quiet resync passes. 0 disables resync.
    pub resync_interval: u64,
}

impl DaemonConfig {
    /// Load and validate a JSON5 configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.bridge.validate()?;
        if self.registry.retry_interval_ms == 0 {
            return Err(Error::config("retry_interval_ms must be greater than 0"));
        }
        Ok(())
    }
}
