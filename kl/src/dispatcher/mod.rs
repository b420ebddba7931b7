//! Key-serialized request dispatcher
//!
//! Requests that resolve to the same key run one at a time in submission
//! order. Each request passes through before-send, the transport, then the
//! success or error chain and finally the complete chain; every callback is
//! fault-isolated.

mod config;
mod core;
mod key;
mod queue;
mod request;

pub use config::DispatcherConfig;
pub use core::{Dispatcher, DispatcherMetrics, DispatcherStats, NotificationSink};
pub use key::{FieldKeyResolver, KeyResolver};
pub use queue::{KeyAdmission, KeyQueue, QueueStats};
pub use request::{
    Admission, BeforeSendFn, CompleteFn, Completion, ErrorFn, Outcome, RequestDescriptor, RequestId, RequestOwner,
    RequestTicket, SendGuard, SuccessFn,
};
