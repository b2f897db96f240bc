use anyhow::{Context, Result};
use ords_db::OrderStore;
use tracing::info;

use crate::OrderCache;

/// Seed `cache` with the `capacity` most recently created orders.
///
/// The store returns newest first; orders are admitted oldest first so the
/// newest order ends up as the most recent admission (last to be evicted).
/// A store failure aborts the warm-start and nothing is admitted.
pub async fn warm_start(store: &dyn OrderStore, cache: &OrderCache) -> Result<usize> {
    let orders = store
        .fetch_last_orders(cache.capacity())
        .await
        .context("unable to get last orders")?;

    let loaded = orders.len();
    for order in orders.into_iter().rev() {
        cache.add(order);
    }

    info!(loaded, capacity = cache.capacity(), "cache warm-start complete");
    Ok(loaded)
}
