//! Wire-level request and response types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    #[default]
    Post,
    Put,
    Delete,
}

impl Method {
    /// Whether the payload travels as query parameters
    pub fn uses_query(&self) -> bool {
        matches!(self, Method::Get | Method::Delete)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!("Unknown method: {}", s)),
        }
    }
}

/// Response body the caller expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Text,
    Json,
}

/// The only request shape a transport ever sees
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub url: String,
    pub method: Method,
    pub timeout: Duration,
    pub data: Value,
    pub content_type: Option<String>,
    pub data_type: DataType,
    pub cache: bool,
}

impl TransportRequest {
    /// Whether the payload should be sent as a JSON body
    pub fn wants_json_body(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| ct.contains("json"))
    }

    /// Flatten an object payload into string pairs for query or form encoding
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        match &self.data {
            Value::Object(map) => map
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Raw transport reply before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(data: Value, content_type: Option<&str>) -> TransportRequest {
        TransportRequest {
            url: "/save".to_string(),
            method: Method::Post,
            timeout: Duration::from_secs(30),
            data,
            content_type: content_type.map(str::to_string),
            data_type: DataType::Text,
            cache: true,
        }
    }

    #[test]
    fn test_method_parse_and_display() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert!("PATCHY".parse::<Method>().is_err());
        assert_eq!(Method::default(), Method::Post);
        assert!(Method::Get.uses_query());
        assert!(!Method::Post.uses_query());
    }

    #[test]
    fn test_method_serde() {
        assert_eq!(serde_yaml::to_string(&Method::Get).unwrap().trim(), "GET");
        let parsed: Method = serde_yaml::from_str("PUT").unwrap();
        assert_eq!(parsed, Method::Put);
    }

    #[test]
    fn test_form_pairs() {
        let req = request(json!({"componentUid": "c1", "n": 3, "skip": null, "nested": {"a": 1}}), None);
        let mut pairs = req.form_pairs();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("componentUid".to_string(), "c1".to_string()),
                ("n".to_string(), "3".to_string()),
                ("nested".to_string(), r#"{"a":1}"#.to_string()),
            ]
        );
        assert!(request(json!([1, 2]), None).form_pairs().is_empty());
    }

    #[test]
    fn test_wants_json_body() {
        assert!(request(json!({}), Some("application/json; charset=utf-8")).wants_json_body());
        assert!(!request(json!({}), Some("application/x-www-form-urlencoded")).wants_json_body());
        assert!(!request(json!({}), None).wants_json_body());
    }
}
