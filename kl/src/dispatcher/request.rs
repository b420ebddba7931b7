//! Request descriptors, callbacks and completion types

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::response::Response;
use crate::transport::{DataType, Method, TransportError};

/// Unique id assigned at admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Uuid);

impl RequestId {
    pub(crate) fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type BeforeSendFn = Box<dyn FnOnce(&mut SendGuard<'_>) -> eyre::Result<()> + Send>;
pub type SuccessFn = Box<dyn FnOnce(&Response) -> eyre::Result<()> + Send>;
pub type ErrorFn = Box<dyn FnOnce(&TransportError) -> eyre::Result<()> + Send>;
pub type CompleteFn = Box<dyn FnOnce(&Completion) -> eyre::Result<()> + Send>;

/// Owner-side callbacks, invoked after the request's own closures
///
/// Every method defaults to doing nothing, so owners implement only what they
/// care about.
pub trait RequestOwner: Send + Sync {
    /// Label used in fault reports
    fn name(&self) -> &str {
        "owner"
    }

    fn before_send(&self, _guard: &mut SendGuard<'_>) -> eyre::Result<()> {
        Ok(())
    }

    fn success(&self, _response: &Response) -> eyre::Result<()> {
        Ok(())
    }

    fn error(&self, _error: &TransportError) -> eyre::Result<()> {
        Ok(())
    }

    fn complete(&self, _completion: &Completion) -> eyre::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Callbacks {
    pub before_send: Option<BeforeSendFn>,
    pub success: Option<SuccessFn>,
    pub error: Option<ErrorFn>,
    pub complete: Option<CompleteFn>,
}

/// A request as the caller describes it
///
/// Built fluently; only the transport-relevant fields ever reach a transport.
pub struct RequestDescriptor {
    pub(crate) url: String,
    pub(crate) method: Option<Method>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) data: Value,
    pub(crate) content_type: Option<String>,
    pub(crate) data_type: DataType,
    pub(crate) cache: bool,
    pub(crate) key: Option<String>,
    pub(crate) abort: bool,
    pub(crate) context: Option<String>,
    pub(crate) callbacks: Callbacks,
    pub(crate) owner: Option<Arc<dyn RequestOwner>>,
}

impl RequestDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: None,
            timeout: None,
            data: Value::Object(Map::new()),
            content_type: None,
            data_type: DataType::default(),
            cache: true,
            key: None,
            abort: false,
            context: None,
            callbacks: Callbacks::default(),
            owner: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::Get)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::Post)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the whole payload
    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Set one payload field, turning a non-object payload into an object
    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        if !self.data.is_object() {
            self.data = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.data {
            map.insert(name.into(), value);
        }
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Serialize on this key instead of the resolved one
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Abort before sending; completion callbacks still run
    pub fn abort(mut self) -> Self {
        self.abort = true;
        self
    }

    /// Label carried into fault reports
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn before_send<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut SendGuard<'_>) -> eyre::Result<()> + Send + 'static,
    {
        self.callbacks.before_send = Some(Box::new(f));
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Response) -> eyre::Result<()> + Send + 'static,
    {
        self.callbacks.success = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&TransportError) -> eyre::Result<()> + Send + 'static,
    {
        self.callbacks.error = Some(Box::new(f));
        self
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Completion) -> eyre::Result<()> + Send + 'static,
    {
        self.callbacks.complete = Some(Box::new(f));
        self
    }

    pub fn owner(mut self, owner: Arc<dyn RequestOwner>) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn payload(&self) -> &Value {
        &self.data
    }

    pub fn key_override(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn context_label(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

impl std::fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .field("key", &self.key)
            .field("abort", &self.abort)
            .field("context", &self.context)
            .field("owner", &self.owner.as_ref().map(|owner| owner.name().to_string()))
            .finish_non_exhaustive()
    }
}

/// Pre-send view of a request
///
/// The payload is mutable and the request can be aborted. Url, method,
/// timeout and key are fixed at construction and read-only here.
pub struct SendGuard<'a> {
    pub(crate) url: &'a str,
    pub(crate) method: Method,
    pub(crate) timeout: Duration,
    pub(crate) key: Option<&'a str>,
    pub(crate) data: &'a mut Value,
    pub(crate) aborted: &'a mut bool,
}

impl SendGuard<'_> {
    pub fn url(&self) -> &str {
        self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn key(&self) -> Option<&str> {
        self.key
    }

    pub fn data(&self) -> &Value {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut Value {
        &mut *self.data
    }

    pub fn abort(&mut self) {
        *self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        *self.aborted
    }
}

/// How a request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded { status: u16 },
    Failed { message: String },
    Aborted,
}

/// Passed to complete callbacks and returned through the ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub request_id: RequestId,
    pub key: Option<String>,
    pub outcome: Outcome,
}

/// What `Dispatcher::admit` did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Handed to the transport
    Sent,

    /// Aborted in before-send; already complete
    Aborted,

    /// Waiting behind an in-flight request for the same key
    Queued { position: usize },
}

/// Handle returned from admission
#[derive(Debug)]
pub struct RequestTicket {
    pub id: RequestId,
    pub key: Option<String>,
    pub admission: Admission,
    pub(crate) done: oneshot::Receiver<Completion>,
}

impl RequestTicket {
    /// Wait until the request has run its complete callbacks
    pub async fn completed(self) -> eyre::Result<Completion> {
        self.done
            .await
            .map_err(|_| eyre::eyre!("Request {} dropped before completion", self.id))
    }
}

/// A request owned by the dispatcher from admission to completion
pub(crate) struct RequestEnvelope {
    pub id: RequestId,
    pub key: Option<String>,
    pub descriptor: RequestDescriptor,
    pub done: Option<oneshot::Sender<Completion>>,
}
