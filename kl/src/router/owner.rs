//! Listener owners
//!
//! An owner groups registrations for bulk removal and carries the destroyed
//! flag the router checks before every delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

/// Stable owner identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(u64);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "owner-{}", self.0)
    }
}

/// Cloneable handle to an owner
///
/// Clones share the destroyed flag, so destroying any clone marks the owner
/// destroyed everywhere.
#[derive(Debug, Clone)]
pub struct OwnerHandle {
    id: OwnerId,
    name: Arc<str>,
    destroyed: Arc<AtomicBool>,
}

impl OwnerHandle {
    pub fn new(name: impl AsRef<str>) -> Self {
        let id = OwnerId(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed));
        debug!(%id, name = name.as_ref(), "OwnerHandle::new: called");
        Self {
            id,
            name: Arc::from(name.as_ref()),
            destroyed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> OwnerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark the owner destroyed; its listeners are swept on the next dispatch that reaches them
    pub fn destroy(&self) {
        debug!(id = %self.id, "OwnerHandle::destroy: called");
        self.destroyed.store(true, Ordering::Release);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

impl PartialEq for OwnerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OwnerHandle {}
