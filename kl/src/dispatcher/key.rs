//! Request key resolution

use serde_json::Value;

use super::request::RequestDescriptor;

/// Derives the serialization key for a request
///
/// Requests without a key are never queued. Any
/// `Fn(&RequestDescriptor) -> Option<String>` closure is a resolver.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, request: &RequestDescriptor) -> Option<String>;
}

impl<F> KeyResolver for F
where
    F: Fn(&RequestDescriptor) -> Option<String> + Send + Sync,
{
    fn resolve(&self, request: &RequestDescriptor) -> Option<String> {
        self(request)
    }
}

/// Reads the key from a string field of the payload
#[derive(Debug, Clone)]
pub struct FieldKeyResolver {
    field: String,
}

impl FieldKeyResolver {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl KeyResolver for FieldKeyResolver {
    fn resolve(&self, request: &RequestDescriptor) -> Option<String> {
        request
            .payload()
            .get(&self.field)
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}
