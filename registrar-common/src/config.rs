use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// When to deregister the services of an exited container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeregisterPolicy {
    /// Deregister as soon as the container's task is deleted.
    #[default]
    Always,
    /// Deregister only once the runtime reports the container is no longer
    /// running; otherwise fall back to TTL-based expiry.
    OnSuccess,
}

/// Behavioral switches for the bridge engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Override for the advertised host IP.
    pub host_ip: String,

    /// Use internal ports instead of published ones (reserved).
    pub internal: bool,

    /// Only register containers with an explicit name attribute (reserved).
    pub explicit: bool,

    /// Take the advertised IP from this container label (reserved).
    pub use_ip_from_label: String,

    /// Comma-separated tags appended to every registered service.
    pub force_tags: String,

    /// Service TTL in seconds. 0 means no expiry.
    pub refresh_ttl: u64,

    /// Seconds between TTL refresh heartbeats. 0 disables refreshing.
    pub refresh_interval: u64,

    /// Deregistration policy for exited containers.
    pub deregister: DeregisterPolicy,

    /// Enable the dangling-entry sweep during resync.
    pub cleanup: bool,

    /// Data center identifier passed through to agent registration.
    pub data_center_id: String,
}

impl BridgeConfig {
    /// Validate the ttl/interval coupling.
    ///
    /// Both must be zero (no TTL heartbeat) or both positive with the TTL
    /// strictly greater than the interval, otherwise registered services
    /// would expire between two heartbeats.
    pub fn validate(&self) -> Result<()> {
        if (self.refresh_ttl == 0) != (self.refresh_interval == 0) {
            return Err(Error::config(
                "refresh_ttl and refresh_interval must be specified together or not at all",
            ));
        }
        if self.refresh_ttl > 0 && self.refresh_ttl <= self.refresh_interval {
            return Err(Error::config(
                "refresh_ttl must be greater than refresh_interval",
            ));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Load a configuration file in JSON5 format.
pub fn load_config<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&content)
}

/// Load a configuration from a JSON5 string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}
