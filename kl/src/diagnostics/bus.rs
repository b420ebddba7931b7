//! Diagnostics bus - broadcast fan-out of fault reports
//!
//! The bus uses a tokio broadcast channel so any number of consumers (log
//! shippers, UI panels, tests) can observe faults without the reporting side
//! knowing about them.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::Diagnostics;
use super::types::Fault;

/// Default channel capacity (faults)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_000;

/// Broadcast sink for fault reports
///
/// Every reported fault is logged and then sent to all current subscribers.
/// Reporting never blocks and never fails: with no subscribers the fault is
/// only logged.
pub struct DiagnosticsBus {
    tx: broadcast::Sender<Fault>,
}

impl DiagnosticsBus {
    /// Create a new bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "DiagnosticsBus::new: creating diagnostics bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Subscribe to receive faults reported after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Fault> {
        debug!("DiagnosticsBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for DiagnosticsBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl Diagnostics for DiagnosticsBus {
    fn report(&self, fault: Fault) {
        warn!(
            kind = %fault.kind,
            origin = %fault.origin,
            context = fault.context.as_deref().unwrap_or(""),
            "{}",
            fault.message
        );
        // No subscribers is OK
        let _ = self.tx.send(fault);
    }
}

/// Create a diagnostics bus wrapped in an Arc for shared ownership
pub fn create_diagnostics_bus() -> Arc<DiagnosticsBus> {
    Arc::new(DiagnosticsBus::with_default_capacity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::FaultKind;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_bus_subscribe() {
        let bus = DiagnosticsBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_bus_report_without_subscribers() {
        let bus = DiagnosticsBus::new(16);
        // Must not panic
        bus.report(Fault::new(FaultKind::CallbackFault, "test", "boom"));
    }

    #[tokio::test]
    async fn test_bus_delivers_to_every_subscriber() {
        let bus = DiagnosticsBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.report(Fault::new(FaultKind::MalformedRecord, "router.dispatch", "bad json"));

        let f1 = rx1.recv().await.unwrap();
        let f2 = rx2.recv().await.unwrap();
        assert_eq!(f1.kind, FaultKind::MalformedRecord);
        assert_eq!(f2.origin, "router.dispatch");
        assert!(matches!(rx1.try_recv(), Err(TryRecvError::Empty)));
    }
}
