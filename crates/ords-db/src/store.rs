use anyhow::Result;
use async_trait::async_trait;
use ords_schemas::Order;

/// Result of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The order header already existed; nothing new was written for it.
    AlreadyPresent,
}

/// Durable order storage contract.
///
/// Implementations must be `Send + Sync`: one handle is shared by the
/// ingestion task and every HTTP request task.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Write header, delivery, payment and every item as one unit.
    ///
    /// Rows that already exist by primary key (order_uid) or by
    /// (order_uid, chrt_id) are skipped, not reported as errors. On any other
    /// failure nothing is left behind.
    async fn insert_order(&self, order: &Order) -> Result<InsertOutcome>;

    /// Point lookup. `Ok(None)` means the order does not exist.
    async fn fetch_order(&self, order_uid: &str) -> Result<Option<Order>>;

    /// Up to `limit` fully hydrated orders, newest `date_created` first.
    async fn fetch_last_orders(&self, limit: usize) -> Result<Vec<Order>>;
}
