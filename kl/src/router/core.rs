//! Router core - registration and priority-ordered dispatch

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::RouterConfig;
use super::error::RouterError;
use super::owner::{OwnerHandle, OwnerId};
use super::record::Record;
use super::registration::{Delivery, Handler, KeySelector, Listener, ListenerId, Registration};
use super::registry::{Registry, Snapshot};
use super::tier::Tier;
use crate::diagnostics::{Diagnostics, Fault, FaultKind, run_isolated};
use crate::dispatcher::NotificationSink;

/// Which registrations `Router::unregister` removes
#[derive(Debug, Clone)]
pub struct UnregisterFilter {
    owner: OwnerId,
    domain: Option<String>,
    handler: Option<Handler>,
}

impl UnregisterFilter {
    /// Every registration of `owner`
    pub fn owner(owner: &OwnerHandle) -> Self {
        Self {
            owner: owner.id(),
            domain: None,
            handler: None,
        }
    }

    /// Only registrations in `domain`
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Only registrations using this handler
    pub fn handler(mut self, handler: &Handler) -> Self {
        self.handler = Some(handler.clone());
        self
    }
}

/// Counts from one dispatch call, nested levels included
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub delivered: usize,
    pub faults: usize,
    pub skipped_empty: usize,
    pub skipped_suspended: usize,
    pub skipped_destroyed: usize,
    pub nested: usize,
}

/// Point-in-time router metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct RouterMetrics {
    pub listeners: usize,
    pub tiers: Vec<String>,
    pub dispatches: u64,
    pub delivered: u64,
    pub faults: u64,
    pub malformed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    dispatches: AtomicU64,
    delivered: AtomicU64,
    faults: AtomicU64,
    malformed: AtomicU64,
}

/// Key-indexed, priority-ordered notification router
///
/// Registry state sits behind an `RwLock` that is released before any handler
/// runs, so handlers may register, unregister or dispatch re-entrantly.
pub struct Router {
    config: RouterConfig,
    registry: RwLock<Registry>,
    diagnostics: Arc<dyn Diagnostics>,
    counters: Counters,
}

impl Router {
    pub fn new(config: RouterConfig, diagnostics: Arc<dyn Diagnostics>) -> Self {
        debug!(?config, "Router::new: called");
        Self {
            config,
            registry: RwLock::new(Registry::default()),
            diagnostics,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|poisoned| {
            warn!("Router::read: registry lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|poisoned| {
            warn!("Router::write: registry lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Register a listener and return its id
    pub fn register(&self, registration: Registration) -> Result<ListenerId, RouterError> {
        debug!(owner = %registration.owner.id(), keys = ?registration.keys, "Router::register: called");
        let mut registration = registration;

        if let KeySelector::Keys(keys) = &registration.keys {
            if keys.is_empty() {
                return Err(RouterError::InvalidRegistration("empty key list".to_string()));
            }
            if keys.iter().any(|key| key == &self.config.wildcard) {
                registration.keys = KeySelector::Wildcard;
            }
        }

        let index_keys = match &registration.keys {
            KeySelector::Wildcard => {
                registration.subset = false;
                vec![self.config.wildcard.clone()]
            }
            KeySelector::Keys(keys) => {
                let mut seen = BTreeSet::new();
                keys.iter()
                    .filter(|key| !self.config.is_ignored(key))
                    .filter(|key| seen.insert(key.as_str()))
                    .cloned()
                    .collect()
            }
        };

        let tier = Tier::resolve(registration.priority, registration.delayed);
        let mut registry = self.write();
        let id = registry.next_id();
        registry.insert(Listener::new(id, registration, tier, index_keys));
        debug!(%id, %tier, "Router::register: registered");
        Ok(id)
    }

    /// Remove registrations matching `filter`, returning how many were removed
    pub fn unregister(&self, filter: UnregisterFilter) -> usize {
        debug!(owner = %filter.owner, domain = ?filter.domain, "Router::unregister: called");
        self.write()
            .remove(filter.owner, filter.domain.as_deref(), filter.handler.as_ref())
    }

    /// Stop delivering to a listener without removing it
    pub fn suspend(&self, id: ListenerId) -> bool {
        debug!(%id, "Router::suspend: called");
        self.set_suspended(id, true)
    }

    pub fn resume(&self, id: ListenerId) -> bool {
        debug!(%id, "Router::resume: called");
        self.set_suspended(id, false)
    }

    fn set_suspended(&self, id: ListenerId, suspended: bool) -> bool {
        match self.read().get(id) {
            Some(listener) => {
                listener.set_suspended(suspended);
                true
            }
            None => false,
        }
    }

    /// Parse `text` as a record and dispatch it
    pub fn dispatch_text(&self, text: &str) -> Result<DispatchReport, RouterError> {
        debug!(len = text.len(), "Router::dispatch_text: called");
        match Record::parse(text) {
            Ok(record) => Ok(self.dispatch(&record)),
            Err(e) => {
                self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                self.diagnostics
                    .report(Fault::new(FaultKind::MalformedRecord, "router.dispatch", e.to_string()));
                Err(RouterError::MalformedRecord(e))
            }
        }
    }

    /// Deliver `record` to every matching listener, tier by tier
    pub fn dispatch(&self, record: &Record) -> DispatchReport {
        debug!(keys = record.len(), "Router::dispatch: called");
        self.counters.dispatches.fetch_add(1, Ordering::Relaxed);
        let mut report = DispatchReport::default();

        // Fixed for the whole pass: handlers that register or unregister only affect later dispatches
        let (tiers, snapshot) = {
            let registry = self.read();
            (registry.tiers(), registry.snapshot(record, &self.config.wildcard, None))
        };
        for tier in tiers {
            self.dispatch_tier(record, tier, 0, &snapshot, &mut report);
        }
        report
    }

    /// Deliver `record` only to listeners in `tier`
    pub fn dispatch_at(&self, record: &Record, tier: Tier) -> DispatchReport {
        debug!(%tier, keys = record.len(), "Router::dispatch_at: called");
        self.counters.dispatches.fetch_add(1, Ordering::Relaxed);
        let mut report = DispatchReport::default();
        let snapshot = self.read().snapshot(record, &self.config.wildcard, Some(tier));
        self.dispatch_tier(record, tier, 0, &snapshot, &mut report);
        report
    }

    fn dispatch_tier(&self, record: &Record, tier: Tier, depth: usize, snapshot: &Snapshot, report: &mut DispatchReport) {
        if let Some(listeners) = snapshot.get(&tier) {
            for listener in listeners.values() {
                self.fire(listener, record, depth, report);
            }
        }

        // Nested records see the registry as it is when they are reached
        for nested in record.nested(&self.config.nested_field) {
            report.nested += 1;
            let nested_snapshot = self.read().snapshot(&nested, &self.config.wildcard, Some(tier));
            self.dispatch_tier(&nested, tier, depth + 1, &nested_snapshot, report);
        }
    }

    fn fire(&self, listener: &Listener, record: &Record, depth: usize, report: &mut DispatchReport) {
        if listener.owner.is_destroyed() {
            debug!(id = %listener.id, owner = %listener.owner.id(), "Router::fire: owner destroyed, sweeping");
            self.unregister(UnregisterFilter::owner(&listener.owner));
            report.skipped_destroyed += 1;
            return;
        }
        if listener.is_suspended() {
            report.skipped_suspended += 1;
            return;
        }
        let Some(subset) = listener.select(record) else {
            report.skipped_empty += 1;
            return;
        };

        let delivery = Delivery {
            listener_id: listener.id,
            tier: listener.tier,
            depth,
            record: subset,
        };
        let ok = run_isolated(
            self.diagnostics.as_ref(),
            "router.handler",
            Some(listener.owner.name()),
            || listener.handler.call(&delivery),
        );
        if ok {
            report.delivered += 1;
            self.counters.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            report.faults += 1;
            self.counters.faults.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Whether any listener is registered in the given domains (all when `None`)
    pub fn has_keys(&self, domains: Option<&[&str]>) -> bool {
        self.read().has_keys(domains)
    }

    /// Registered keys grouped by domain
    pub fn key_index(&self, domains: Option<&[&str]>) -> BTreeMap<Option<String>, BTreeSet<String>> {
        self.read().key_index(domains)
    }

    /// Tiers currently in use, ascending
    pub fn tiers(&self) -> Vec<Tier> {
        self.read().tiers()
    }

    pub fn listener_count(&self) -> usize {
        self.read().listener_count()
    }

    /// Listener ids currently held for `owner`
    pub fn owner_listeners(&self, owner: &OwnerHandle) -> Vec<ListenerId> {
        self.read().owner_listeners(owner.id())
    }

    pub fn metrics(&self) -> RouterMetrics {
        let registry = self.read();
        RouterMetrics {
            listeners: registry.listener_count(),
            tiers: registry.tiers().iter().map(Tier::to_string).collect(),
            dispatches: self.counters.dispatches.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            faults: self.counters.faults.load(Ordering::Relaxed),
            malformed: self.counters.malformed.load(Ordering::Relaxed),
        }
    }
}

impl NotificationSink for Router {
    fn notify(&self, record: &Record) {
        let report = self.dispatch(record);
        info!(
            delivered = report.delivered,
            faults = report.faults,
            "Router::notify: dispatched response record"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticsBus;
    use serde_json::json;
    use std::sync::Mutex;

    fn router() -> (Arc<Router>, Arc<DiagnosticsBus>) {
        let bus = Arc::new(DiagnosticsBus::new(64));
        let router = Arc::new(Router::new(RouterConfig::default(), bus.clone()));
        (router, bus)
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, label: &str) -> Handler {
        let log = log.clone();
        let label = label.to_string();
        Handler::new(move |delivery| {
            log.lock().unwrap().push(format!("{}@{}:{}", label, delivery.depth, delivery.record));
            Ok(())
        })
    }

    fn labels(log: &Log) -> Vec<String> {
        log.lock()
            .unwrap()
            .iter()
            .map(|entry| entry.split(':').next().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_register_rejects_empty_keys() {
        let (router, _) = router();
        let owner = OwnerHandle::new("o");
        let result = router.register(Registration::new(
            &owner,
            KeySelector::Keys(Vec::new()),
            Handler::new(|_| Ok(())),
        ));
        assert!(matches!(result, Err(RouterError::InvalidRegistration(_))));
    }

    #[test]
    fn test_register_ids_increase() {
        let (router, _) = router();
        let owner = OwnerHandle::new("o");
        let a = router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), Handler::new(|_| Ok(()))))
            .unwrap();
        let b = router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), Handler::new(|_| Ok(()))))
            .unwrap();
        assert!(b > a);
        assert_eq!(router.owner_listeners(&owner), vec![a, b]);
    }

    #[test]
    fn test_required_field_subset() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("o");
        router
            .register(
                Registration::new(&owner, KeySelector::keys(["A", "B"]), recorder(&log, "l"))
                    .required_fields(["version"]),
            )
            .unwrap();

        let record = Record::parse(r#"{"A": {"version": 1}, "B": {"other": 1}}"#).unwrap();
        let report = router.dispatch(&record);

        assert_eq!(report.delivered, 1);
        assert_eq!(log.lock().unwrap()[0], r#"l@0:{"A":{"version":1}}"#);
    }

    #[test]
    fn test_subset_off_delivers_full_record() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), recorder(&log, "l")).subset(false))
            .unwrap();

        let record = Record::parse(r#"{"A": {"x": 1}, "Z": {"y": 2}}"#).unwrap();
        router.dispatch(&record);

        assert_eq!(log.lock().unwrap()[0], r#"l@0:{"A":{"x":1},"Z":{"y":2}}"#);
    }

    #[test]
    fn test_wildcard_sees_everything() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["*"]), recorder(&log, "all")))
            .unwrap();

        router.dispatch(&Record::new().with("anything", json!({"v": 1})));
        assert_eq!(labels(&log), vec!["all@0"]);
    }

    #[test]
    fn test_ignored_keys_are_not_indexed() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["manual"]), recorder(&log, "m")))
            .unwrap();

        router.dispatch(&Record::new().with("manual", json!({"v": 1})));
        assert!(log.lock().unwrap().is_empty());
        assert!(!router.has_keys(None));
    }

    #[test]
    fn test_tiers_run_in_order() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), recorder(&log, "delayed")).delayed(true))
            .unwrap();
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), recorder(&log, "high")).priority(50))
            .unwrap();
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), recorder(&log, "first")))
            .unwrap();

        router.dispatch(&Record::new().with("A", json!({"v": 1})));
        assert_eq!(labels(&log), vec!["first@0", "high@0", "delayed@0"]);
    }

    #[test]
    fn test_multi_key_listener_fires_once() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["A", "B"]), recorder(&log, "l")))
            .unwrap();

        let report = router.dispatch(&Record::parse(r#"{"A": {"v": 1}, "B": {"v": 2}}"#).unwrap());
        assert_eq!(report.delivered, 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_nested_records_before_next_tier() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["P"]), recorder(&log, "parent")))
            .unwrap();
        router
            .register(Registration::new(&owner, KeySelector::keys(["C"]), recorder(&log, "child")))
            .unwrap();
        router
            .register(Registration::new(&owner, KeySelector::keys(["P"]), recorder(&log, "late")).delayed(true))
            .unwrap();

        let record = Record::parse(r#"{"P": {"v": 1, "componentMessages": {"C": {"v": 2}}}}"#).unwrap();
        let report = router.dispatch(&record);

        assert_eq!(labels(&log), vec!["parent@0", "child@1", "late@0"]);
        assert_eq!(report.delivered, 3);
    }

    #[test]
    fn test_dispatch_at_restricts_tier() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), recorder(&log, "zero")))
            .unwrap();
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), recorder(&log, "five")).priority(5))
            .unwrap();

        router.dispatch_at(&Record::new().with("A", json!({})), Tier::Explicit(5));
        assert_eq!(labels(&log), vec!["five@0"]);
    }

    #[test]
    fn test_failing_handler_does_not_block_others() {
        let (router, bus) = router();
        let mut faults = bus.subscribe();
        let log = Log::default();
        let owner = OwnerHandle::new("faulty");
        router
            .register(Registration::new(
                &owner,
                KeySelector::keys(["A"]),
                Handler::new(|_| Err(eyre::eyre!("handler failed"))),
            ))
            .unwrap();
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), Handler::new(|_| panic!("boom"))))
            .unwrap();
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), recorder(&log, "ok")))
            .unwrap();

        let report = router.dispatch(&Record::new().with("A", json!({})));
        assert_eq!(report.faults, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(labels(&log), vec!["ok@0"]);

        let fault = faults.try_recv().unwrap();
        assert_eq!(fault.kind, FaultKind::CallbackFault);
        assert_eq!(fault.context.as_deref(), Some("faulty"));
    }

    #[test]
    fn test_destroyed_owner_is_swept() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("gone");
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), recorder(&log, "l")))
            .unwrap();

        owner.destroy();
        let report = router.dispatch(&Record::new().with("A", json!({})));

        assert_eq!(report.skipped_destroyed, 1);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(router.listener_count(), 0);
        assert!(router.owner_listeners(&owner).is_empty());
    }

    #[test]
    fn test_suspend_and_resume() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("o");
        let id = router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), recorder(&log, "l")))
            .unwrap();
        let record = Record::new().with("A", json!({}));

        assert!(router.suspend(id));
        assert_eq!(router.dispatch(&record).skipped_suspended, 1);

        assert!(router.resume(id));
        assert_eq!(router.dispatch(&record).delivered, 1);
        assert!(!router.suspend(ListenerId(999)));
    }

    #[test]
    fn test_unregister_empties_indexes() {
        let (router, _) = router();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["A", "B"]), Handler::new(|_| Ok(()))))
            .unwrap();
        router
            .register(
                Registration::new(&owner, KeySelector::keys(["C"]), Handler::new(|_| Ok(()))).domain("componentUUID"),
            )
            .unwrap();

        assert_eq!(router.unregister(UnregisterFilter::owner(&owner)), 2);
        assert!(router.owner_listeners(&owner).is_empty());
        assert!(!router.has_keys(None));
        assert!(router.key_index(None).is_empty());
        assert!(router.tiers().is_empty());
    }

    #[test]
    fn test_unregister_by_domain() {
        let (router, _) = router();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), Handler::new(|_| Ok(()))))
            .unwrap();
        router
            .register(Registration::new(&owner, KeySelector::keys(["B"]), Handler::new(|_| Ok(()))).domain("alt"))
            .unwrap();

        assert_eq!(router.unregister(UnregisterFilter::owner(&owner).domain("alt")), 1);
        let index = router.key_index(None);
        assert_eq!(index.len(), 1);
        assert!(index[&None].contains("A"));
    }

    #[test]
    fn test_handler_may_reenter_router() {
        let (router, _) = router();
        let owner = OwnerHandle::new("o");
        let inner = router.clone();
        let inner_owner = owner.clone();
        router
            .register(Registration::new(
                &owner,
                KeySelector::keys(["A"]),
                Handler::new(move |_| {
                    inner.register(Registration::new(
                        &inner_owner,
                        KeySelector::keys(["B"]),
                        Handler::new(|_| Ok(())),
                    ))?;
                    Ok(())
                }),
            ))
            .unwrap();

        router.dispatch(&Record::new().with("A", json!({})));
        assert_eq!(router.listener_count(), 2);
    }

    #[test]
    fn test_unregister_during_dispatch_keeps_current_pass() {
        let (router, _) = router();
        let log = Log::default();
        let first = OwnerHandle::new("first");
        let later = OwnerHandle::new("later");

        let inner = router.clone();
        let target = later.clone();
        let tier0_log = log.clone();
        router
            .register(Registration::new(
                &first,
                KeySelector::keys(["X"]),
                Handler::new(move |_| {
                    tier0_log.lock().unwrap().push("tier0@0".to_string());
                    inner.unregister(UnregisterFilter::owner(&target));
                    Ok(())
                }),
            ))
            .unwrap();
        router
            .register(Registration::new(&later, KeySelector::keys(["X"]), recorder(&log, "delayed")).delayed(true))
            .unwrap();

        router.dispatch(&Record::new().with("X", json!({"v": 1})));
        assert_eq!(labels(&log), vec!["tier0@0", "delayed@0"]);

        // Removal takes effect on the next dispatch
        log.lock().unwrap().clear();
        router.dispatch(&Record::new().with("X", json!({"v": 2})));
        assert_eq!(labels(&log), vec!["tier0@0"]);
    }

    #[test]
    fn test_register_during_dispatch_waits_for_next_pass() {
        let (router, _) = router();
        let log = Log::default();
        let owner = OwnerHandle::new("o");

        let inner = router.clone();
        let inner_owner = owner.clone();
        let late_log = log.clone();
        let registered = Arc::new(std::sync::atomic::AtomicBool::new(false));
        router
            .register(Registration::new(
                &owner,
                KeySelector::keys(["X"]),
                Handler::new(move |_| {
                    if !registered.swap(true, Ordering::SeqCst) {
                        inner.register(
                            Registration::new(&inner_owner, KeySelector::keys(["X"]), recorder(&late_log, "late"))
                                .delayed(true),
                        )?;
                    }
                    Ok(())
                }),
            ))
            .unwrap();

        router.dispatch(&Record::new().with("X", json!({"v": 1})));
        assert!(labels(&log).is_empty());
        assert_eq!(router.tiers(), vec![Tier::DEFAULT, Tier::Delayed]);

        router.dispatch(&Record::new().with("X", json!({"v": 2})));
        assert_eq!(labels(&log), vec!["late@0"]);
    }

    #[test]
    fn test_fault_does_not_block_later_tiers() {
        let (router, bus) = router();
        let mut faults = bus.subscribe();
        let log = Log::default();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), Handler::new(|_| panic!("tier0 boom"))))
            .unwrap();
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), recorder(&log, "delayed")).delayed(true))
            .unwrap();

        let report = router.dispatch(&Record::new().with("A", json!({})));
        assert_eq!(report.faults, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(labels(&log), vec!["delayed@0"]);
        assert!(faults.try_recv().unwrap().message.contains("tier0 boom"));
    }

    #[test]
    fn test_dispatch_text_malformed() {
        let (router, bus) = router();
        let mut faults = bus.subscribe();

        let result = router.dispatch_text("{not json");
        assert!(matches!(result, Err(RouterError::MalformedRecord(_))));
        assert_eq!(faults.try_recv().unwrap().kind, FaultKind::MalformedRecord);
        assert_eq!(router.metrics().malformed, 1);

        // Later calls are unaffected
        assert!(router.dispatch_text(r#"{"A": {}}"#).is_ok());
    }

    #[test]
    fn test_metrics_snapshot() {
        let (router, _) = router();
        let owner = OwnerHandle::new("o");
        router
            .register(Registration::new(&owner, KeySelector::keys(["A"]), Handler::new(|_| Ok(()))).delayed(true))
            .unwrap();
        router.dispatch(&Record::new().with("A", json!({})));

        let metrics = router.metrics();
        assert_eq!(metrics.listeners, 1);
        assert_eq!(metrics.tiers, vec!["delayed".to_string()]);
        assert_eq!(metrics.dispatches, 1);
        assert_eq!(metrics.delivered, 1);
    }
}
