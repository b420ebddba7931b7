//! Fault report types
//!
//! A fault is anything caught at an isolation boundary: a callback or handler
//! that returned an error or panicked, or an inbound payload that could not be
//! parsed. Faults are reported, never propagated to the caller that triggered
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a reported fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultKind {
    /// A registered callback or listener handler failed
    CallbackFault,
    /// An inbound notification record could not be parsed
    MalformedRecord,
    /// A transport response looked structured but did not parse
    MalformedResponse,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CallbackFault => write!(f, "callback-fault"),
            Self::MalformedRecord => write!(f, "malformed-record"),
            Self::MalformedResponse => write!(f, "malformed-response"),
        }
    }
}

/// A single fault report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,

    /// Boundary that caught the fault, e.g. `dispatcher.success` or `router.handler`
    pub origin: String,

    pub message: String,

    /// Caller supplied label (request context or owner name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Fault {
    pub fn new(kind: FaultKind, origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin: origin.into(),
            message: message.into(),
            context: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: Option<impl Into<String>>) -> Self {
        self.context = context.map(Into::into);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_kind_display() {
        assert_eq!(FaultKind::CallbackFault.to_string(), "callback-fault");
        assert_eq!(FaultKind::MalformedRecord.to_string(), "malformed-record");
        assert_eq!(FaultKind::MalformedResponse.to_string(), "malformed-response");
    }

    #[test]
    fn test_fault_serialization_skips_empty_context() {
        let fault = Fault::new(FaultKind::MalformedRecord, "router.dispatch", "expected value");
        let json = serde_json::to_string(&fault).unwrap();
        assert!(json.contains("\"kind\":\"malformed-record\""));
        assert!(!json.contains("context"));

        let fault = fault.with_context(Some("editor-7"));
        let json = serde_json::to_string(&fault).unwrap();
        assert!(json.contains("\"context\":\"editor-7\""));
    }
}
