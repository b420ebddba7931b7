//! Transport adapter
//!
//! The dispatcher hands a [`TransportRequest`] to a [`Transport`] and gets a
//! [`RawResponse`] or a [`TransportError`] back. Nothing else about the
//! caller's request crosses this boundary.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

mod error;
mod http;
mod request;

pub use error::TransportError;
pub use http::HttpTransport;
pub use request::{DataType, Method, RawResponse, TransportRequest};

use crate::config::TransportConfig;

/// Executes a single request
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError>;
}

/// Create the HTTP transport described by `config`
pub fn create_transport(config: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
    debug!(base_url = ?config.base_url, "create_transport: called");
    Ok(Arc::new(HttpTransport::from_config(config)?))
}
