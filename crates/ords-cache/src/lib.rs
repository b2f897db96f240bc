//! ords-cache
//!
//! Fixed-capacity, thread-safe map from `order_uid` to [`Order`], evicting in
//! admission order (FIFO, not LRU).
//!
//! # Invariants
//! - At most `capacity` entries are held.
//! - The key map and the admission sequence are mutated together under one
//!   write lock: every key in the map appears exactly once in the sequence and
//!   vice versa.
//! - `get` never changes eviction order.
//! - Re-adding a key that is already present replaces its value and moves it
//!   to the tail of the admission sequence. It never evicts another key.
//!
//! No I/O happens while the lock is held. [`warm_start`] and [`lookup_order`]
//! talk to the store outside of any cache critical section.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ords_schemas::Order;
use thiserror::Error;

mod lookup;
mod warm;

pub use lookup::{lookup_order, LookupError};
pub use warm::warm_start;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache capacity must be at least 1")]
    ZeroCapacity,
}

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<String, Order>,
    /// Oldest admission at the front.
    admission: VecDeque<String>,
}

#[derive(Debug)]
pub struct OrderCache {
    capacity: NonZeroUsize,
    slots: RwLock<Slots>,
}

impl OrderCache {
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity)?;
        Ok(Self {
            capacity,
            slots: RwLock::new(Slots {
                entries: HashMap::with_capacity(capacity.get()),
                admission: VecDeque::with_capacity(capacity.get()),
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Admit `order`. Returns the key evicted to make room, if any.
    pub fn add(&self, order: Order) -> Option<String> {
        let key = order.order_uid.clone();
        let mut slots = self.write();

        let mut evicted = None;
        if slots.entries.contains_key(&key) {
            if let Some(pos) = slots.admission.iter().position(|k| *k == key) {
                slots.admission.remove(pos);
            }
        } else if slots.admission.len() >= self.capacity.get() {
            if let Some(oldest) = slots.admission.pop_front() {
                slots.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }

        slots.admission.push_back(key.clone());
        slots.entries.insert(key, order);
        evicted
    }

    /// Clone of the cached order, if present. Does not affect eviction order.
    pub fn get(&self, order_uid: &str) -> Option<Order> {
        self.read().entries.get(order_uid).cloned()
    }

    pub fn contains(&self, order_uid: &str) -> bool {
        self.read().entries.contains_key(order_uid)
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Snapshot of keys, oldest admission first (next eviction candidate first).
    pub fn admission_order(&self) -> Vec<String> {
        self.read().admission.iter().cloned().collect()
    }

    // Lock poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}
