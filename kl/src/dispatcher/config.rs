//! Dispatcher configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::transport::Method;

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Send every request immediately, ignoring per-key serialization
    #[serde(rename = "ignore-queuing", default)]
    pub ignore_queuing: bool,

    /// Payload field the default key resolver reads
    #[serde(rename = "identity-field", default = "default_identity_field")]
    pub identity_field: String,

    /// Timeout for requests that set none, in milliseconds
    #[serde(rename = "default-timeout-ms", default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Method for requests that set none
    #[serde(rename = "default-method", default)]
    pub default_method: Method,
}

fn default_identity_field() -> String {
    debug!("default_identity_field: called");
    "componentUid".to_string()
}

fn default_timeout_ms() -> u64 {
    debug!("default_timeout_ms: called");
    30_000
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        debug!("DispatcherConfig::default: called");
        Self {
            ignore_queuing: false,
            identity_field: default_identity_field(),
            default_timeout_ms: default_timeout_ms(),
            default_method: Method::Post,
        }
    }
}

impl DispatcherConfig {
    /// Get the default timeout as a Duration
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}
