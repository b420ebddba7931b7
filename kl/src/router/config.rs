//! Router configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Field inside a field-set that carries an embedded record
    #[serde(rename = "nested-field", default = "default_nested_field")]
    pub nested_field: String,

    /// Keys that are accepted on registration but never indexed
    #[serde(rename = "ignored-keys", default = "default_ignored_keys")]
    pub ignored_keys: Vec<String>,

    /// Key that selects every record when passed in a registration's key list
    #[serde(default = "default_wildcard")]
    pub wildcard: String,
}

fn default_nested_field() -> String {
    debug!("default_nested_field: called");
    "componentMessages".to_string()
}

fn default_ignored_keys() -> Vec<String> {
    debug!("default_ignored_keys: called");
    vec!["manual".to_string()]
}

fn default_wildcard() -> String {
    debug!("default_wildcard: called");
    "*".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        debug!("RouterConfig::default: called");
        Self {
            nested_field: default_nested_field(),
            ignored_keys: default_ignored_keys(),
            wildcard: default_wildcard(),
        }
    }
}

impl RouterConfig {
    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignored_keys.iter().any(|ignored| ignored == key)
    }
}
