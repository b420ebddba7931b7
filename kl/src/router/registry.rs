//! Listener registry - forward, reverse and tier indexes
//!
//! The registry holds no locks of its own; `Router` wraps it in an `RwLock`.
//! Every mutation keeps three views consistent:
//!
//! - forward: domain -> key -> listener id -> listener
//! - reverse: domain -> owner -> listener ids present in the forward view
//! - tiers: tier -> number of indexed listeners using it

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use super::owner::OwnerId;
use super::record::Record;
use super::registration::{Handler, Listener, ListenerId};
use super::tier::Tier;

type Domain = Option<String>;
type Bucket = BTreeMap<ListenerId, Arc<Listener>>;

/// Candidate listeners for one dispatch, grouped by tier and deduplicated by id
pub(crate) type Snapshot = BTreeMap<Tier, Bucket>;

#[derive(Debug, Default)]
pub(crate) struct Registry {
    last_id: u64,
    forward: HashMap<Domain, HashMap<String, Bucket>>,
    reverse: HashMap<Domain, HashMap<OwnerId, Vec<ListenerId>>>,
    by_id: HashMap<ListenerId, Arc<Listener>>,
    tiers: BTreeMap<Tier, usize>,
}

impl Registry {
    pub fn next_id(&mut self) -> ListenerId {
        self.last_id += 1;
        ListenerId(self.last_id)
    }

    /// Index a listener under each of its index keys
    ///
    /// A listener with no index keys (every key ignored) is accepted but never
    /// stored, so it cannot appear in any dispatch.
    pub fn insert(&mut self, listener: Listener) {
        debug!(id = %listener.id, keys = ?listener.index_keys, "Registry::insert: called");
        if listener.index_keys.is_empty() {
            return;
        }

        let listener = Arc::new(listener);
        let domain = listener.domain.clone();

        let keys = self.forward.entry(domain.clone()).or_default();
        for key in &listener.index_keys {
            keys.entry(key.clone()).or_default().insert(listener.id, Arc::clone(&listener));
        }

        self.reverse
            .entry(domain)
            .or_default()
            .entry(listener.owner.id())
            .or_default()
            .push(listener.id);

        *self.tiers.entry(listener.tier).or_insert(0) += 1;
        self.by_id.insert(listener.id, listener);
    }

    /// Remove an owner's listeners, optionally narrowed to one domain or handler
    ///
    /// Returns the number of listeners removed.
    pub fn remove(&mut self, owner: OwnerId, domain: Option<&str>, handler: Option<&Handler>) -> usize {
        debug!(%owner, ?domain, handler = handler.is_some(), "Registry::remove: called");
        let domains: Vec<Domain> = match domain {
            Some(domain) => vec![Some(domain.to_string())],
            None => self.reverse.keys().cloned().collect(),
        };

        let mut removed = 0;
        for domain in domains {
            let Some(ids) = self.reverse.get_mut(&domain).and_then(|owners| owners.remove(&owner)) else {
                continue;
            };

            let (matching, remaining): (Vec<ListenerId>, Vec<ListenerId>) = ids.into_iter().partition(|id| {
                self.by_id
                    .get(id)
                    .is_none_or(|listener| handler.is_none_or(|h| listener.handler.same_as(h)))
            });

            for id in matching {
                if self.detach(&domain, id) {
                    removed += 1;
                }
            }

            // Rebuild the reverse bucket from the ids still present
            let remaining: Vec<ListenerId> = remaining.into_iter().filter(|id| self.by_id.contains_key(id)).collect();
            if let Some(owners) = self.reverse.get_mut(&domain) {
                if !remaining.is_empty() {
                    owners.insert(owner, remaining);
                }
                if owners.is_empty() {
                    self.reverse.remove(&domain);
                }
            }
        }
        removed
    }

    fn detach(&mut self, domain: &Domain, id: ListenerId) -> bool {
        let Some(listener) = self.by_id.remove(&id) else {
            return false;
        };

        if let Some(keys) = self.forward.get_mut(domain) {
            for key in &listener.index_keys {
                if let Some(bucket) = keys.get_mut(key) {
                    bucket.remove(&id);
                    if bucket.is_empty() {
                        keys.remove(key);
                    }
                }
            }
            if keys.is_empty() {
                self.forward.remove(domain);
            }
        }

        if let Some(count) = self.tiers.get_mut(&listener.tier) {
            *count -= 1;
            if *count == 0 {
                self.tiers.remove(&listener.tier);
            }
        }
        true
    }

    pub fn get(&self, id: ListenerId) -> Option<Arc<Listener>> {
        self.by_id.get(&id).cloned()
    }

    /// Listeners matching any key of `record` or the wildcard, across all domains
    pub fn snapshot(&self, record: &Record, wildcard: &str, restrict: Option<Tier>) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for keys in self.forward.values() {
            let lookups = record.keys().map(String::as_str).chain(std::iter::once(wildcard));
            for key in lookups {
                let Some(bucket) = keys.get(key) else { continue };
                for (id, listener) in bucket {
                    if restrict.is_some_and(|tier| tier != listener.tier) {
                        continue;
                    }
                    snapshot.entry(listener.tier).or_default().insert(*id, Arc::clone(listener));
                }
            }
        }
        snapshot
    }

    pub fn tiers(&self) -> Vec<Tier> {
        self.tiers.keys().copied().collect()
    }

    pub fn listener_count(&self) -> usize {
        self.by_id.len()
    }

    pub fn owner_listeners(&self, owner: OwnerId) -> Vec<ListenerId> {
        let mut ids: Vec<ListenerId> = self
            .reverse
            .values()
            .filter_map(|owners| owners.get(&owner))
            .flatten()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    pub fn has_keys(&self, domains: Option<&[&str]>) -> bool {
        self.forward
            .iter()
            .any(|(domain, keys)| domain_selected(domain, domains) && !keys.is_empty())
    }

    /// Registered keys grouped by domain, sorted for stable output
    pub fn key_index(&self, domains: Option<&[&str]>) -> BTreeMap<Option<String>, BTreeSet<String>> {
        self.forward
            .iter()
            .filter(|(domain, _)| domain_selected(domain, domains))
            .map(|(domain, keys)| (domain.clone(), keys.keys().cloned().collect()))
            .collect()
    }
}

fn domain_selected(domain: &Domain, filter: Option<&[&str]>) -> bool {
    match filter {
        None => true,
        Some(wanted) => domain.as_deref().is_some_and(|d| wanted.contains(&d)),
    }
}
