//! Diagnostics sink and fault isolation
//!
//! Every boundary where caller code runs (request callbacks, listener
//! handlers) and every place an inbound payload is parsed reports failures
//! through an injected [`Diagnostics`] implementation instead of propagating
//! them. [`run_isolated`] is the single helper those boundaries use.
//!
//! # Usage
//!
//! ```rust,ignore
//! use keyline::diagnostics::{create_diagnostics_bus, run_isolated};
//!
//! let bus = create_diagnostics_bus();
//! let mut faults = bus.subscribe();
//!
//! run_isolated(bus.as_ref(), "example", None, || Err(eyre::eyre!("boom")));
//! assert_eq!(faults.try_recv().unwrap().message, "boom");
//! ```

mod bus;
mod types;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, DiagnosticsBus, create_diagnostics_bus};
pub use types::{Fault, FaultKind};

/// Receiver of fault reports
pub trait Diagnostics: Send + Sync {
    fn report(&self, fault: Fault);
}

/// Diagnostics sink that only writes faults to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, fault: Fault) {
        warn!(
            kind = %fault.kind,
            origin = %fault.origin,
            context = fault.context.as_deref().unwrap_or(""),
            "{}",
            fault.message
        );
    }
}

/// Run caller code behind a fault boundary
///
/// Returns `true` when `f` completed normally. An `Err` return or a panic is
/// reported as [`FaultKind::CallbackFault`] and yields `false`; it is never
/// re-raised.
pub fn run_isolated<F>(diagnostics: &dyn Diagnostics, origin: &str, context: Option<&str>, f: F) -> bool
where
    F: FnOnce() -> eyre::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            diagnostics.report(Fault::new(FaultKind::CallbackFault, origin, format!("{e:#}")).with_context(context));
            false
        }
        Err(payload) => {
            let message = format!("panicked: {}", panic_message(payload.as_ref()));
            diagnostics.report(Fault::new(FaultKind::CallbackFault, origin, message).with_context(context));
            false
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_isolated_ok() {
        let bus = DiagnosticsBus::new(8);
        let mut rx = bus.subscribe();

        assert!(run_isolated(&bus, "test", None, || Ok(())));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_run_isolated_reports_error() {
        let bus = DiagnosticsBus::new(8);
        let mut rx = bus.subscribe();

        let ok = run_isolated(&bus, "dispatcher.success", Some("editor"), || Err(eyre::eyre!("boom")));
        assert!(!ok);

        let fault = rx.try_recv().unwrap();
        assert_eq!(fault.kind, FaultKind::CallbackFault);
        assert_eq!(fault.origin, "dispatcher.success");
        assert_eq!(fault.message, "boom");
        assert_eq!(fault.context.as_deref(), Some("editor"));
    }

    #[test]
    fn test_run_isolated_catches_panic() {
        let bus = DiagnosticsBus::new(8);
        let mut rx = bus.subscribe();

        let ok = run_isolated(&bus, "router.handler", None, || panic!("handler exploded"));
        assert!(!ok);

        let fault = rx.try_recv().unwrap();
        assert!(fault.message.contains("handler exploded"));
    }

    #[test]
    fn test_tracing_diagnostics_does_not_panic() {
        TracingDiagnostics.report(Fault::new(FaultKind::MalformedResponse, "test", "oops"));
    }
}
