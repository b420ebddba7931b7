//! HTTP transport built on reqwest

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{RawResponse, Transport, TransportError, TransportRequest};
use super::request::{DataType, Method};
use crate::config::TransportConfig;

/// Transport that executes requests over HTTP
///
/// Relative urls are joined onto the configured base url. Requests are sent
/// once; there is no retry.
pub struct HttpTransport {
    base_url: Option<String>,
    http: Client,
}

impl HttpTransport {
    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        debug!(?config, "HttpTransport::from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            base_url: config.base_url.clone(),
            http,
        })
    }

    pub(crate) fn resolve_url(&self, url: &str) -> Result<String, TransportError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }
        match &self.base_url {
            Some(base) => Ok(format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))),
            None => Err(TransportError::InvalidRequest(format!(
                "relative url '{}' with no base-url configured",
                url
            ))),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let url = self.resolve_url(&request.url)?;
        debug!(%url, method = %request.method, timeout = ?request.timeout, "HttpTransport::send: called");

        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Put => self.http.put(&url),
            Method::Delete => self.http.delete(&url),
        }
        .timeout(request.timeout);

        if !request.cache {
            builder = builder.header(reqwest::header::CACHE_CONTROL, "no-cache");
        }
        if request.data_type == DataType::Json {
            builder = builder.header(reqwest::header::ACCEPT, "application/json");
        }

        builder = if request.method.uses_query() {
            builder.query(&request.form_pairs())
        } else if request.wants_json_body() {
            builder.json(&request.data)
        } else {
            builder.form(&request.form_pairs())
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                debug!("HttpTransport::send: timed out");
                TransportError::Timeout(request.timeout)
            } else {
                TransportError::Network(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.timeout)
            } else {
                TransportError::Network(e)
            }
        })?;
        debug!(status = %status.as_u16(), body_len = body.len(), "HttpTransport::send: response received");

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}
