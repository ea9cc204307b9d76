//! Key-value store with deferred waiters
//!
//! Holds published values and, for keys that have no value yet, the ordered
//! callbacks waiting for one. A single mutex guards both tables so that
//! publishing a value and draining its waiters happen in one critical section.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;

use crate::turns::Turns;

/// Callback invoked once with the value published under a key
pub type Waiter<V> = Box<dyn FnOnce(V) + Send + 'static>;

/// A key with outstanding waiters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unfulfilled {
    pub name: String,
    pub waiters: usize,
}

struct Slots<V> {
    items: HashMap<String, V>,
    waiters: BTreeMap<String, Vec<Waiter<V>>>,
}

/// The key-value store
pub struct Services<V> {
    slots: Mutex<Slots<V>>,
    turns: Arc<Turns>,
}

impl<V> Services<V>
where
    V: Clone + Send + 'static,
{
    /// Create an empty store that drains waiters through `turns`
    pub fn new(turns: Arc<Turns>) -> Self {
        Self {
            slots: Mutex::new(Slots {
                items: HashMap::new(),
                waiters: BTreeMap::new(),
            }),
            turns,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots<V>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.lock().items.get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.lock().items.contains_key(key)
    }

    /// Publish `value` under `key`, returning the value it replaced
    ///
    /// Waiters pending on the key are detached here and invoked on a later
    /// turn, never on the caller's stack.
    pub fn set(&self, key: &str, value: V) -> Option<V> {
        let (previous, waiting) = {
            let mut slots = self.lock();
            let previous = slots.items.insert(key.to_string(), value.clone());
            (previous, slots.waiters.remove(key))
        };

        if let Some(waiting) = waiting {
            debug!(%key, waiters = waiting.len(), "Services::set: draining waiters");
            self.turns.defer(move || {
                for waiter in waiting {
                    waiter(value.clone());
                }
            });
        }

        previous
    }

    /// Invoke `waiter` with the value under `key`
    ///
    /// Runs immediately when the key already has a value; otherwise the waiter
    /// is queued behind any earlier ones for the same key.
    pub fn register_waiter(&self, key: &str, waiter: Waiter<V>) {
        let mut slots = self.lock();
        match slots.items.get(key).cloned() {
            Some(value) => {
                drop(slots);
                waiter(value);
            }
            None => {
                let waiting = slots.waiters.entry(key.to_string()).or_default();
                waiting.push(waiter);
                debug!(%key, waiters = waiting.len(), "Services::register_waiter: queued");
            }
        }
    }

    /// Snapshot of keys with outstanding waiters, or `None` if nothing is pending
    pub fn list_unfulfilled(&self) -> Option<Vec<Unfulfilled>> {
        let slots = self.lock();
        if slots.waiters.is_empty() {
            return None;
        }
        Some(
            slots
                .waiters
                .iter()
                .map(|(name, waiting)| Unfulfilled {
                    name: name.clone(),
                    waiters: waiting.len(),
                })
                .collect(),
        )
    }
}
