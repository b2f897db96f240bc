use ords_db::OrderStore;
use ords_schemas::Order;
use thiserror::Error;
use tracing::debug;

use crate::OrderCache;

#[derive(Debug, Error)]
pub enum LookupError {
    /// Absent from both the cache and the store.
    #[error("order {order_uid} not found")]
    NotFound { order_uid: String },

    #[error("store lookup failed for order {order_uid}: {cause:#}")]
    Store {
        order_uid: String,
        cause: anyhow::Error,
    },
}

/// Read-through lookup: cache first, then the store. A store hit is admitted
/// to the cache before it is returned.
pub async fn lookup_order(
    cache: &OrderCache,
    store: &dyn OrderStore,
    order_uid: &str,
) -> Result<Order, LookupError> {
    if let Some(order) = cache.get(order_uid) {
        debug!(order_uid, "cache hit");
        return Ok(order);
    }

    match store.fetch_order(order_uid).await {
        Ok(Some(order)) => {
            debug!(order_uid, "cache miss; loaded from store");
            cache.add(order.clone());
            Ok(order)
        }
        Ok(None) => Err(LookupError::NotFound {
            order_uid: order_uid.to_string(),
        }),
        Err(cause) => Err(LookupError::Store {
            order_uid: order_uid.to_string(),
            cause,
        }),
    }
}
