//! Named event manager
//!
//! Decoupled owner-to-owner signalling by event name. Handlers registered for
//! a name run when it is triggered: normal handlers first, then delayed ones,
//! each in registration order. Values returned by handlers are collected and
//! handed back to the trigger caller, which lets events double as queries.
//!
//! # Usage
//!
//! ```rust,ignore
//! let events = EventManager::new(create_diagnostics_bus());
//! let editor = OwnerHandle::new("editor");
//! events.register(&editor, "getActiveComponent", EventHandler::new(|_| Ok(Some(json!("c1")))));
//! assert_eq!(events.trigger("getActiveComponent", &[]), vec![json!("c1")]);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostics, run_isolated};
use crate::router::{OwnerHandle, OwnerId, Tier};

/// Identifier of one event registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

/// Event handler; `Some` return values are collected by `trigger`
#[derive(Clone)]
pub struct EventHandler(Arc<dyn Fn(&[Value]) -> eyre::Result<Option<Value>> + Send + Sync>);

impl EventHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> eyre::Result<Option<Value>> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Whether both handles point at the same function
    pub fn same_as(&self, other: &EventHandler) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    fn call(&self, args: &[Value]) -> eyre::Result<Option<Value>> {
        (self.0)(args)
    }
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EventHandler").finish_non_exhaustive()
    }
}

/// Which registrations `EventManager::unregister` removes
#[derive(Debug, Clone)]
pub struct EventFilter {
    owner: OwnerId,
    event: Option<String>,
    handler: Option<EventHandler>,
}

impl EventFilter {
    /// Every registration of `owner`, across all event names
    pub fn owner(owner: &OwnerHandle) -> Self {
        Self {
            owner: owner.id(),
            event: None,
            handler: None,
        }
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn handler(mut self, handler: &EventHandler) -> Self {
        self.handler = Some(handler.clone());
        self
    }
}

#[derive(Debug)]
struct EventListener {
    id: EventId,
    owner: OwnerHandle,
    tier: Tier,
    handler: EventHandler,
}

#[derive(Debug, Default)]
struct EventRegistry {
    last_id: u64,
    events: HashMap<String, BTreeMap<EventId, Arc<EventListener>>>,
}

impl EventRegistry {
    fn remove(&mut self, filter: &EventFilter) -> usize {
        let mut removed = 0;
        for (name, listeners) in self.events.iter_mut() {
            if filter.event.as_ref().is_some_and(|event| event != name) {
                continue;
            }
            let before = listeners.len();
            listeners.retain(|_, listener| {
                let owner_matches = listener.owner.id() == filter.owner;
                let handler_matches = filter.handler.as_ref().is_none_or(|h| h.same_as(&listener.handler));
                !(owner_matches && handler_matches)
            });
            removed += before - listeners.len();
        }
        self.events.retain(|_, listeners| !listeners.is_empty());
        removed
    }
}

/// Registry of named events and their handlers
pub struct EventManager {
    registry: RwLock<EventRegistry>,
    diagnostics: Arc<dyn Diagnostics>,
    stack: Mutex<Vec<String>>,
}

impl EventManager {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        debug!("EventManager::new: called");
        Self {
            registry: RwLock::new(EventRegistry::default()),
            diagnostics,
            stack: Mutex::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, EventRegistry> {
        self.registry.read().unwrap_or_else(|poisoned| {
            warn!("EventManager::read: registry lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, EventRegistry> {
        self.registry.write().unwrap_or_else(|poisoned| {
            warn!("EventManager::write: registry lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn stack(&self) -> MutexGuard<'_, Vec<String>> {
        self.stack.lock().unwrap_or_else(|poisoned| {
            warn!("EventManager::stack: lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Register `handler` for `event`
    pub fn register(&self, owner: &OwnerHandle, event: impl Into<String>, handler: EventHandler) -> EventId {
        self.insert(owner, event.into(), handler, Tier::DEFAULT)
    }

    /// Register `handler` to run after every normal handler of `event`
    pub fn register_delayed(&self, owner: &OwnerHandle, event: impl Into<String>, handler: EventHandler) -> EventId {
        self.insert(owner, event.into(), handler, Tier::Delayed)
    }

    fn insert(&self, owner: &OwnerHandle, event: String, handler: EventHandler, tier: Tier) -> EventId {
        debug!(owner = %owner.id(), %event, %tier, "EventManager::register: called");
        let mut registry = self.write();
        registry.last_id += 1;
        let id = EventId(registry.last_id);
        let listener = EventListener {
            id,
            owner: owner.clone(),
            tier,
            handler,
        };
        registry.events.entry(event).or_default().insert(id, Arc::new(listener));
        id
    }

    /// Remove registrations matching `filter`, returning how many were removed
    pub fn unregister(&self, filter: EventFilter) -> usize {
        debug!(owner = %filter.owner, event = ?filter.event, "EventManager::unregister: called");
        self.write().remove(&filter)
    }

    /// Fire `event` with `args`, returning the values handlers produced
    ///
    /// Handlers are fixed when the trigger starts. A failing or panicking
    /// handler is reported and skipped. Owners found destroyed are
    /// unregistered.
    pub fn trigger(&self, event: &str, args: &[Value]) -> Vec<Value> {
        debug!(%event, args = args.len(), "EventManager::trigger: called");
        let mut listeners: Vec<Arc<EventListener>> = match self.read().events.get(event) {
            Some(bucket) => bucket.values().cloned().collect(),
            None => return Vec::new(),
        };
        listeners.sort_by_key(|listener| (listener.tier, listener.id));

        self.stack().push(event.to_string());
        let mut results = Vec::new();
        for listener in listeners {
            if listener.owner.is_destroyed() {
                debug!(id = %listener.id, owner = %listener.owner.id(), "EventManager::trigger: owner destroyed, sweeping");
                self.unregister(EventFilter::owner(&listener.owner));
                continue;
            }

            let mut produced = None;
            run_isolated(self.diagnostics.as_ref(), "events.handler", Some(listener.owner.name()), || {
                produced = listener.handler.call(args)?;
                Ok(())
            });
            results.extend(produced);
        }
        self.stack().pop();
        results
    }

    /// Names of events currently being triggered, outermost first
    pub fn active(&self) -> Vec<String> {
        self.stack().clone()
    }

    /// Number of registrations for `event`, or for all events
    pub fn listener_count(&self, event: Option<&str>) -> usize {
        let registry = self.read();
        match event {
            Some(event) => registry.events.get(event).map_or(0, BTreeMap::len),
            None => registry.events.values().map(BTreeMap::len).sum(),
        }
    }

    /// Registrations for `event` counted per owner name
    pub fn owner_counts(&self, event: &str) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        if let Some(bucket) = self.read().events.get(event) {
            for listener in bucket.values() {
                *counts.entry(listener.owner.name().to_string()).or_insert(0) += 1;
            }
        }
        counts
    }
}
