//! Per-key busy flags and FIFO queues

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

/// Result of offering an item to its key
#[derive(Debug)]
pub enum KeyAdmission<T> {
    /// Key was idle; it is now busy and the item should run
    Proceed(T),

    /// Key was busy; the item waits at this 1-based position
    Deferred { position: usize },
}

#[derive(Debug)]
struct KeyState<T> {
    busy: bool,
    queue: VecDeque<T>,
}

impl<T> Default for KeyState<T> {
    fn default() -> Self {
        Self {
            busy: false,
            queue: VecDeque::new(),
        }
    }
}

/// Statistics for the key queue
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total_admitted: u64,
    pub total_deferred: u64,
    pub total_released: u64,
    pub peak_queue_depth: usize,
}

/// At most one running item per key, the rest waiting in submission order
///
/// Key state is created on first use and kept (idle) once its queue drains.
#[derive(Debug)]
pub struct KeyQueue<T> {
    keys: HashMap<String, KeyState<T>>,
    stats: QueueStats,
}

impl<T> Default for KeyQueue<T> {
    fn default() -> Self {
        Self {
            keys: HashMap::new(),
            stats: QueueStats::default(),
        }
    }
}

impl<T> KeyQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, key: &str, item: T) -> KeyAdmission<T> {
        self.stats.total_admitted += 1;
        let state = self.keys.entry(key.to_string()).or_default();
        if !state.busy {
            state.busy = true;
            return KeyAdmission::Proceed(item);
        }

        state.queue.push_back(item);
        let position = state.queue.len();
        self.stats.total_deferred += 1;
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(position);
        KeyAdmission::Deferred { position }
    }

    /// The running item for `key` finished
    ///
    /// Returns the next waiting item, which now holds the key. With nothing
    /// waiting the key goes idle.
    pub fn release(&mut self, key: &str) -> Option<T> {
        self.stats.total_released += 1;
        let state = self.keys.get_mut(key)?;
        match state.queue.pop_front() {
            Some(next) => {
                state.busy = true;
                Some(next)
            }
            None => {
                state.busy = false;
                None
            }
        }
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.keys.get(key).is_some_and(|state| state.busy)
    }

    pub fn queued(&self, key: &str) -> usize {
        self.keys.get(key).map_or(0, |state| state.queue.len())
    }

    pub fn total_queued(&self) -> usize {
        self.keys.values().map(|state| state.queue.len()).sum()
    }

    pub fn busy_keys(&self) -> usize {
        self.keys.values().filter(|state| state.busy).count()
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }
}
