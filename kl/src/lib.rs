//! Keyline - key-serialized requests and priority-ordered notifications
//!
//! Many independent callers issue overlapping requests against shared
//! server-side resources and must observe state changes in a consistent
//! order. Keyline solves that with two cooperating parts.
//!
//! # Core Concepts
//!
//! - **One in flight per key**: requests for the same resource key run one at
//!   a time in submission order; different keys run concurrently
//! - **Tiered delivery**: notification records fan out to listeners tier by
//!   tier, each listener seeing only the keys it registered for
//! - **Nested records**: records embedded in a field-set are delivered at the
//!   same tier before the next tier starts
//! - **Fault isolation**: a failing callback or handler is reported, never
//!   propagated, and never stops its neighbours
//!
//! # Modules
//!
//! - [`dispatcher`] - Key-serialized request dispatcher
//! - [`router`] - Key-indexed, priority-ordered notification router
//! - [`events`] - Named events with delayed handlers and collected results
//! - [`transport`] - Transport trait and HTTP implementation
//! - [`response`] - Response classification
//! - [`diagnostics`] - Fault reporting and isolation
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod events;
pub mod response;
pub mod router;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, TransportConfig};
pub use diagnostics::{Diagnostics, DiagnosticsBus, Fault, FaultKind, TracingDiagnostics, run_isolated};
pub use dispatcher::{
    Admission, Completion, Dispatcher, DispatcherConfig, KeyResolver, NotificationSink, Outcome, RequestDescriptor,
    RequestOwner, RequestTicket, SendGuard,
};
pub use events::{EventFilter, EventHandler, EventId, EventManager};
pub use response::{Payload, Response, classify, is_success_for};
pub use router::{
    Delivery, Handler, KeySelector, OwnerHandle, Record, Registration, Router, RouterConfig, RouterError, Tier,
    UnregisterFilter,
};
pub use transport::{HttpTransport, Method, RawResponse, Transport, TransportError, TransportRequest};
