//! Keyline configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dispatcher::DispatcherConfig;
use crate::router::RouterConfig;

/// Main Keyline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Request dispatcher settings
    pub dispatcher: DispatcherConfig,

    /// Notification router settings
    pub router: RouterConfig,

    /// HTTP transport settings
    pub transport: TransportConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .keyline.yml
        let local_config = PathBuf::from(".keyline.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/keyline/keyline.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("keyline").join("keyline.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base url that relative request urls are joined onto
    #[serde(rename = "base-url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Client-wide timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Method;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(!config.dispatcher.ignore_queuing);
        assert_eq!(config.dispatcher.identity_field, "componentUid");
        assert_eq!(config.router.nested_field, "componentMessages");
        assert_eq!(config.transport.timeout_ms, 30_000);
        assert!(config.transport.base_url.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
dispatcher:
  ignore-queuing: true
  identity-field: resourceId
  default-timeout-ms: 10000
  default-method: GET

router:
  nested-field: children
  ignored-keys: [manual, system]
  wildcard: "**"

transport:
  base-url: https://app.example.com
  timeout-ms: 5000
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert!(config.dispatcher.ignore_queuing);
        assert_eq!(config.dispatcher.identity_field, "resourceId");
        assert_eq!(config.dispatcher.default_method, Method::Get);
        assert_eq!(config.router.nested_field, "children");
        assert_eq!(config.router.ignored_keys.len(), 2);
        assert_eq!(config.router.wildcard, "**");
        assert_eq!(config.transport.base_url.as_deref(), Some("https://app.example.com"));
        assert_eq!(config.transport.timeout_ms, 5000);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
router:
  nested-field: children
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.router.nested_field, "children");

        // Defaults for unspecified
        assert_eq!(config.router.wildcard, "*");
        assert_eq!(config.dispatcher.default_timeout_ms, 30_000);
        assert_eq!(config.transport.timeout_ms, 30_000);
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "transport:\n  base-url: http://localhost:8080").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.transport.base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let missing = PathBuf::from("/nonexistent/keyline.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
