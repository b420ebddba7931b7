//! Dispatcher implementation

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::config::DispatcherConfig;
use super::key::{FieldKeyResolver, KeyResolver};
use super::queue::{KeyAdmission, KeyQueue, QueueStats};
use super::request::{
    Admission, CompleteFn, Completion, Outcome, RequestDescriptor, RequestEnvelope, RequestId, RequestOwner,
    RequestTicket, SendGuard,
};
use crate::diagnostics::{Diagnostics, Fault, FaultKind, TracingDiagnostics, panic_message, run_isolated};
use crate::response::{Payload, Response, classify};
use crate::router::Record;
use crate::transport::{RawResponse, Transport, TransportError, TransportRequest};

/// Receives structured records from successful responses
pub trait NotificationSink: Send + Sync {
    fn notify(&self, record: &Record);
}

/// Statistics for the dispatcher
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct DispatcherStats {
    pub total_sent: u64,
    pub total_aborted: u64,
    pub total_succeeded: u64,
    pub total_failed: u64,
    pub total_completed: u64,
}

/// Point-in-time dispatcher metrics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherMetrics {
    pub busy_keys: usize,
    pub queued: usize,
    pub queue: QueueStats,
    pub requests: DispatcherStats,
}

/// Internal state protected by mutex
struct DispatcherInner {
    queue: KeyQueue<RequestEnvelope>,
    stats: DispatcherStats,
}

/// Key-serialized request dispatcher
///
/// At most one request per key is in flight; later requests for the same key
/// wait in submission order and are sent as each predecessor completes.
/// Keyless requests run concurrently with everything.
///
/// The state mutex is never held across an `.await` or while caller code
/// runs. Transport calls run on spawned tokio tasks, so `admit` must be
/// called from within a tokio runtime.
pub struct Dispatcher {
    config: DispatcherConfig,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn KeyResolver>,
    diagnostics: Arc<dyn Diagnostics>,
    sink: Option<Arc<dyn NotificationSink>>,
    inner: Mutex<DispatcherInner>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig, transport: Arc<dyn Transport>) -> Self {
        debug!(?config, "Dispatcher::new: called");
        let resolver = Arc::new(FieldKeyResolver::new(config.identity_field.clone()));
        Self {
            config,
            transport,
            resolver,
            diagnostics: Arc::new(TracingDiagnostics),
            sink: None,
            inner: Mutex::new(DispatcherInner {
                queue: KeyQueue::new(),
                stats: DispatcherStats::default(),
            }),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn KeyResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Forward structured response records to `sink` before success callbacks run
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, DispatcherInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Dispatcher::lock: state lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Admit a request: send it now or queue it behind its key
    pub fn admit(self: &Arc<Self>, request: RequestDescriptor) -> RequestTicket {
        let key = request
            .key_override()
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| self.resolver.resolve(&request));
        let id = RequestId::new();
        debug!(%id, ?key, url = %request.url(), "Dispatcher::admit: called");

        let (done_tx, done_rx) = oneshot::channel();
        let envelope = RequestEnvelope {
            id,
            key: key.clone(),
            descriptor: request,
            done: Some(done_tx),
        };

        let admission = match key.as_deref() {
            Some(k) if !self.config.ignore_queuing => {
                let offered = self.lock().queue.admit(k, envelope);
                match offered {
                    KeyAdmission::Proceed(envelope) => self.launch(envelope),
                    KeyAdmission::Deferred { position } => {
                        debug!(%id, key = %k, position, "Dispatcher::admit: key busy, queued");
                        Admission::Queued { position }
                    }
                }
            }
            _ => self.launch(envelope),
        };

        RequestTicket {
            id,
            key,
            admission,
            done: done_rx,
        }
    }

    /// Release `key` and start the next queued request for it, if any
    pub fn key_completed(self: &Arc<Self>, key: &str) {
        debug!(%key, "Dispatcher::key_completed: called");
        if let Some(next) = self.release(key) {
            self.launch(next);
        }
    }

    fn release(&self, key: &str) -> Option<RequestEnvelope> {
        if self.config.ignore_queuing {
            return None;
        }
        self.lock().queue.release(key)
    }

    /// Run before-send and either spawn the transport call or finish as aborted
    ///
    /// Aborted requests release their key immediately, so this loops until a
    /// request is actually sent or the key's queue drains. Returns what
    /// happened to the first request.
    fn launch(self: &Arc<Self>, envelope: RequestEnvelope) -> Admission {
        let mut first: Option<Admission> = None;
        let mut current = Some(envelope);

        while let Some(mut envelope) = current.take() {
            if !self.run_before_send(&mut envelope) {
                let request = self.project(&envelope);
                self.spawn_send(envelope, request);
                return first.unwrap_or(Admission::Sent);
            }

            debug!(id = %envelope.id, "Dispatcher::launch: aborted before send");
            if first.is_none() {
                first = Some(Admission::Aborted);
            }
            let key = envelope.key.clone();
            self.finish(envelope, Outcome::Aborted);
            current = key.and_then(|key| self.release(&key));
        }

        first.unwrap_or(Admission::Aborted)
    }

    /// Returns `true` when the request was aborted
    fn run_before_send(&self, envelope: &mut RequestEnvelope) -> bool {
        let descriptor = &mut envelope.descriptor;
        let direct = descriptor.callbacks.before_send.take();
        let owner = descriptor.owner.clone();
        let context = descriptor.context.clone();
        let mut aborted = descriptor.abort;

        {
            let mut guard = SendGuard {
                url: &descriptor.url,
                method: descriptor.method.unwrap_or(self.config.default_method),
                timeout: descriptor.timeout.unwrap_or_else(|| self.config.default_timeout()),
                key: envelope.key.as_deref(),
                data: &mut descriptor.data,
                aborted: &mut aborted,
            };
            if let Some(f) = direct {
                run_isolated(self.diagnostics.as_ref(), "dispatcher.before_send", context.as_deref(), || {
                    f(&mut guard)
                });
            }
            if let Some(owner) = &owner {
                run_isolated(self.diagnostics.as_ref(), "dispatcher.before_send", Some(owner.name()), || {
                    owner.before_send(&mut guard)
                });
            }
        }

        descriptor.abort = aborted;
        aborted
    }

    /// Project the allow-listed transport fields out of a descriptor
    fn project(&self, envelope: &RequestEnvelope) -> TransportRequest {
        let descriptor = &envelope.descriptor;
        TransportRequest {
            url: descriptor.url.clone(),
            method: descriptor.method.unwrap_or(self.config.default_method),
            timeout: descriptor.timeout.unwrap_or_else(|| self.config.default_timeout()),
            data: descriptor.data.clone(),
            content_type: descriptor.content_type.clone(),
            data_type: descriptor.data_type,
            cache: descriptor.cache,
        }
    }

    fn spawn_send(self: &Arc<Self>, envelope: RequestEnvelope, request: TransportRequest) {
        debug!(id = %envelope.id, url = %request.url, method = %request.method, "Dispatcher::spawn_send: called");
        self.lock().stats.total_sent += 1;

        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let result = match AssertUnwindSafe(dispatcher.transport.send(request)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    let message = format!("transport panicked: {}", panic_message(payload.as_ref()));
                    warn!(id = %envelope.id, %message, "Dispatcher::spawn_send: transport panicked");
                    dispatcher.diagnostics.report(
                        Fault::new(FaultKind::CallbackFault, "dispatcher.transport", message.clone())
                            .with_context(envelope.descriptor.context.clone()),
                    );
                    Err(TransportError::Unavailable(message))
                }
            };
            dispatcher.on_transport_result(envelope, result);
        });
    }

    fn on_transport_result(self: &Arc<Self>, mut envelope: RequestEnvelope, result: Result<RawResponse, TransportError>) {
        debug!(id = %envelope.id, ok = result.is_ok(), "Dispatcher::on_transport_result: called");
        let owner = envelope.descriptor.owner.clone();
        let context = envelope.descriptor.context.clone();
        let success = envelope.descriptor.callbacks.success.take();
        let error = envelope.descriptor.callbacks.error.take();
        let diagnostics = self.diagnostics.as_ref();

        let outcome = match result {
            Ok(raw) => {
                let payload = classify(&raw.body, diagnostics);
                if let (Payload::Structured(record), Some(sink)) = (&payload, &self.sink) {
                    sink.notify(record);
                }
                let response = Response {
                    status: raw.status,
                    payload,
                };
                if let Some(f) = success {
                    run_isolated(diagnostics, "dispatcher.success", context.as_deref(), || f(&response));
                }
                if let Some(owner) = &owner {
                    run_isolated(diagnostics, "dispatcher.success", Some(owner.name()), || owner.success(&response));
                }
                Outcome::Succeeded { status: raw.status }
            }
            Err(e) => {
                info!(id = %envelope.id, error = %e, "Dispatcher::on_transport_result: transport failed");
                if let Some(f) = error {
                    run_isolated(diagnostics, "dispatcher.error", context.as_deref(), || f(&e));
                }
                if let Some(owner) = &owner {
                    run_isolated(diagnostics, "dispatcher.error", Some(owner.name()), || owner.error(&e));
                }
                Outcome::Failed { message: e.to_string() }
            }
        };

        let key = envelope.key.clone();
        self.finish(envelope, outcome);
        if let Some(key) = key {
            self.key_completed(&key);
        }
    }

    /// Run the complete chain, update stats and resolve the ticket
    fn finish(&self, mut envelope: RequestEnvelope, outcome: Outcome) {
        let completion = Completion {
            request_id: envelope.id,
            key: envelope.key.clone(),
            outcome,
        };
        let direct: Option<CompleteFn> = envelope.descriptor.callbacks.complete.take();
        let owner: Option<Arc<dyn RequestOwner>> = envelope.descriptor.owner.clone();
        let context = envelope.descriptor.context.as_deref();

        if let Some(f) = direct {
            run_isolated(self.diagnostics.as_ref(), "dispatcher.complete", context, || f(&completion));
        }
        if let Some(owner) = &owner {
            run_isolated(self.diagnostics.as_ref(), "dispatcher.complete", Some(owner.name()), || {
                owner.complete(&completion)
            });
        }

        {
            let mut inner = self.lock();
            inner.stats.total_completed += 1;
            match &completion.outcome {
                Outcome::Succeeded { .. } => inner.stats.total_succeeded += 1,
                Outcome::Failed { .. } => inner.stats.total_failed += 1,
                Outcome::Aborted => inner.stats.total_aborted += 1,
            }
        }

        debug!(id = %completion.request_id, outcome = ?completion.outcome, "Dispatcher::finish: completed");
        if let Some(done) = envelope.done.take() {
            // Ticket may have been dropped
            let _ = done.send(completion);
        }
    }

    pub fn metrics(&self) -> DispatcherMetrics {
        let inner = self.lock();
        DispatcherMetrics {
            busy_keys: inner.queue.busy_keys(),
            queued: inner.queue.total_queued(),
            queue: inner.queue.stats(),
            requests: inner.stats,
        }
    }

    /// Whether a request for `key` is in flight
    pub fn is_busy(&self, key: &str) -> bool {
        self.lock().queue.is_busy(key)
    }

    /// Number of requests waiting behind `key`
    pub fn queued(&self, key: &str) -> usize {
        self.lock().queue.queued(key)
    }
}
