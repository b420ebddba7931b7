//! Response classification
//!
//! A response body that opens with `{` is treated as a structured record;
//! anything else is raw content for the caller to render.

use tracing::debug;

use crate::diagnostics::{Diagnostics, Fault, FaultKind};
use crate::router::Record;

/// Classified response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Structured(Record),
    Content(String),
}

impl Payload {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Payload::Structured(record) => Some(record),
            Payload::Content(_) => None,
        }
    }

    pub fn as_content(&self) -> Option<&str> {
        match self {
            Payload::Content(content) => Some(content),
            Payload::Structured(_) => None,
        }
    }

    /// Raw content that is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.as_content().is_some_and(|content| content.trim().is_empty())
    }
}

/// A completed request's reply as callbacks see it
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub payload: Payload,
}

/// Classify a raw body
///
/// A body that looks structured but fails to parse is reported as
/// [`FaultKind::MalformedResponse`] and classified as an empty record.
pub fn classify(body: &str, diagnostics: &dyn Diagnostics) -> Payload {
    debug!(len = body.len(), "classify: called");
    if !body.trim_start().starts_with('{') {
        return Payload::Content(body.to_string());
    }

    match Record::parse(body) {
        Ok(record) => Payload::Structured(record),
        Err(e) => {
            diagnostics.report(Fault::new(FaultKind::MalformedResponse, "response.classify", e.to_string()));
            Payload::Structured(Record::new())
        }
    }
}

/// Whether a reply reports success for `key`
///
/// Raw content always counts as success. A structured payload needs
/// `record[key].success == true`.
pub fn is_success_for(payload: &Payload, key: &str) -> bool {
    match payload {
        Payload::Content(_) => true,
        Payload::Structured(record) => record
            .fields(key)
            .and_then(|fields| fields.get("success"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticsBus;

    #[test]
    fn test_classify_structured() {
        let bus = DiagnosticsBus::new(8);
        let payload = classify("  {\"c1\": {\"success\": true}}", &bus);
        assert!(payload.as_record().unwrap().has_entry("c1"));
    }

    #[test]
    fn test_classify_content() {
        let bus = DiagnosticsBus::new(8);
        let payload = classify("<div>hello</div>", &bus);
        assert_eq!(payload.as_content(), Some("<div>hello</div>"));
        assert!(!payload.is_blank());
        assert!(classify("  \n", &bus).is_blank());
    }

    #[test]
    fn test_classify_malformed_reports_and_yields_empty_record() {
        let bus = DiagnosticsBus::new(8);
        let mut rx = bus.subscribe();

        let payload = classify("{broken", &bus);
        assert_eq!(payload, Payload::Structured(Record::new()));
        assert_eq!(rx.try_recv().unwrap().kind, FaultKind::MalformedResponse);
    }

    #[test]
    fn test_is_success_for() {
        let bus = DiagnosticsBus::new(8);
        let payload = classify(r#"{"c1": {"success": true}, "c2": {"success": "yes"}}"#, &bus);
        assert!(is_success_for(&payload, "c1"));
        assert!(!is_success_for(&payload, "c2"));
        assert!(!is_success_for(&payload, "c3"));
        assert!(is_success_for(&Payload::Content("done".to_string()), "c1"));
    }
}
