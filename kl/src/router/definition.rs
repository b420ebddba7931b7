//! Listener definitions loaded from YAML
//!
//! Used by `kl route` to register listeners without writing code:
//!
//! ```yaml
//! listeners:
//!   - owner: editor
//!     keys: [c1, c2]
//!     fields: [version]
//!   - owner: audit
//!     keys: ["*"]
//!     delayed: true
//! ```

use std::fs;
use std::path::Path;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::owner::OwnerHandle;
use super::registration::{Handler, KeySelector, Registration};

/// A file of listener definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerFile {
    #[serde(default)]
    pub listeners: Vec<ListenerDefinition>,
}

impl ListenerFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!(path = %path.as_ref().display(), "ListenerFile::load: called");
        let content = fs::read_to_string(&path).context("Failed to read listener file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse listener file")
    }
}

/// One listener definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerDefinition {
    /// Owner name; definitions sharing a name share an owner
    pub owner: String,

    pub keys: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Required field names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,

    #[serde(default = "default_subset")]
    pub subset: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    #[serde(default)]
    pub delayed: bool,
}

fn default_subset() -> bool {
    true
}

impl ListenerDefinition {
    pub fn to_registration(&self, owner: &OwnerHandle, handler: Handler) -> Registration {
        let mut registration = Registration::new(owner, KeySelector::keys(self.keys.iter().cloned()), handler)
            .required_fields(self.fields.iter().cloned())
            .subset(self.subset)
            .delayed(self.delayed);
        if let Some(domain) = &self.domain {
            registration = registration.domain(domain.clone());
        }
        if let Some(priority) = self.priority {
            registration = registration.priority(priority);
        }
        registration
    }
}
