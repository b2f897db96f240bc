use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use ords_db::{InsertOutcome, OrderStore};
use ords_schemas::Order;

/// In-memory [`OrderStore`] with the same idempotency and ordering contract as
/// the Postgres store, plus switchable failure injection.
#[derive(Debug, Default)]
pub struct MemOrderStore {
    orders: Mutex<HashMap<String, Order>>,
    fail_inserts: AtomicBool,
    fail_reads: AtomicBool,
    insert_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MemOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        {
            let mut map = store.lock();
            for o in orders {
                map.entry(o.order_uid.clone()).or_insert(o);
            }
        }
        store
    }

    /// Make every subsequent insert fail until switched back.
    pub fn fail_inserts(&self, on: bool) {
        self.fail_inserts.store(on, Ordering::SeqCst);
    }

    /// Make every subsequent point and batch read fail until switched back.
    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, order_uid: &str) -> bool {
        self.lock().contains_key(order_uid)
    }

    /// Insert attempts, including failed ones.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Point lookups, including failed ones.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Order>> {
        self.orders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl OrderStore for MemOrderStore {
    async fn insert_order(&self, order: &Order) -> Result<InsertOutcome> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            bail!("injected insert failure for order {}", order.order_uid);
        }

        let mut map = self.lock();
        if map.contains_key(&order.order_uid) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        map.insert(order.order_uid.clone(), order.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn fetch_order(&self, order_uid: &str) -> Result<Option<Order>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("injected read failure for order {order_uid}");
        }
        Ok(self.lock().get(order_uid).cloned())
    }

    async fn fetch_last_orders(&self, limit: usize) -> Result<Vec<Order>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("injected read failure for last {limit} orders");
        }

        let mut all: Vec<Order> = self.lock().values().cloned().collect();
        all.sort_by(|a, b| {
            b.date_created
                .cmp(&a.date_created)
                .then_with(|| a.order_uid.cmp(&b.order_uid))
        });
        all.truncate(limit);
        Ok(all)
    }
}
