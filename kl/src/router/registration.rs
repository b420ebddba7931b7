//! Listener registrations and deliveries

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::owner::OwnerHandle;
use super::record::Record;
use super::tier::Tier;

/// Identity of a registered listener, assigned monotonically by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) u64);

impl ListenerId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type HandlerFn = dyn Fn(&Delivery) -> eyre::Result<()> + Send + Sync;

/// Listener callback
///
/// Clones share identity, which is what [`super::UnregisterFilter::handler`]
/// compares against.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Delivery) -> eyre::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn same_as(&self, other: &Handler) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    pub(crate) fn call(&self, delivery: &Delivery) -> eyre::Result<()> {
        (self.0)(delivery)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handler({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Which record keys a registration listens to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
    Keys(Vec<String>),
    Wildcard,
}

impl KeySelector {
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

/// A registration request, built fluently and handed to [`super::Router::register`]
#[derive(Debug, Clone)]
pub struct Registration {
    pub(crate) owner: OwnerHandle,
    pub(crate) keys: KeySelector,
    pub(crate) domain: Option<String>,
    pub(crate) required_fields: Vec<String>,
    pub(crate) subset: bool,
    pub(crate) priority: Option<i32>,
    pub(crate) delayed: bool,
    pub(crate) handler: Handler,
}

impl Registration {
    pub fn new(owner: &OwnerHandle, keys: KeySelector, handler: Handler) -> Self {
        Self {
            owner: owner.clone(),
            keys,
            domain: None,
            required_fields: Vec::new(),
            subset: true,
            priority: None,
            delayed: false,
            handler,
        }
    }

    /// Namespace the registration; `None` is the default domain
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Field names of which at least one must be present in a key's field-set
    pub fn required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Deliver only the listened-to keys (default) or the whole record
    pub fn subset(mut self, subset: bool) -> Self {
        self.subset = subset;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn delayed(mut self, delayed: bool) -> Self {
        self.delayed = delayed;
        self
    }
}

/// A stored registration
#[derive(Debug)]
pub struct Listener {
    pub id: ListenerId,
    pub owner: OwnerHandle,
    pub domain: Option<String>,
    pub keys: KeySelector,
    pub required_fields: Vec<String>,
    pub subset: bool,
    pub tier: Tier,
    pub(crate) handler: Handler,
    pub(crate) index_keys: Vec<String>,
    suspended: AtomicBool,
}

impl Listener {
    pub(crate) fn new(id: ListenerId, registration: Registration, tier: Tier, index_keys: Vec<String>) -> Self {
        Self {
            id,
            owner: registration.owner,
            domain: registration.domain,
            keys: registration.keys,
            required_fields: registration.required_fields,
            subset: registration.subset,
            tier,
            handler: registration.handler,
            index_keys,
            suspended: AtomicBool::new(false),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    pub(crate) fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::Release);
    }

    /// Entries of `record` this listener receives, `None` when nothing qualifies
    pub(crate) fn select(&self, record: &Record) -> Option<Record> {
        let keys = match (&self.keys, self.subset) {
            (KeySelector::Keys(keys), true) => keys,
            _ => return Some(record.clone()),
        };

        let selected: Record = keys
            .iter()
            .filter(|key| record.has_entry(key))
            .filter(|key| self.has_required_field(record, key))
            .filter_map(|key| record.get(key).map(|value| (key.clone(), value.clone())))
            .collect();

        if selected.is_empty() { None } else { Some(selected) }
    }

    fn has_required_field(&self, record: &Record, key: &str) -> bool {
        if self.required_fields.is_empty() {
            return true;
        }
        record
            .fields(key)
            .is_some_and(|fields| self.required_fields.iter().any(|field| fields.contains_key(field)))
    }
}

/// What a handler receives
#[derive(Debug, Clone)]
pub struct Delivery {
    pub listener_id: ListenerId,
    pub tier: Tier,
    /// 0 for a top-level record, incremented for each level of embedding
    pub depth: usize,
    pub record: Record,
}

impl Delivery {
    pub fn is_nested(&self) -> bool {
        self.depth > 0
    }
}
