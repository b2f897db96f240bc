use ords_db::InsertOutcome;
use ords_schemas::Order;
use ords_validate::{validate_order_at, ValidationError};
use thiserror::Error;

use crate::pipeline::IngestContext;

/// Why a message was skipped. None of these stop the loop and none of them
/// commit the message.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("payload is not a valid order document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("order {order_uid:?} failed validation: {source}")]
    Invalid {
        order_uid: String,
        #[source]
        source: ValidationError,
    },

    #[error("failed to persist order {order_uid}: {cause:#}")]
    Persist {
        order_uid: String,
        cause: anyhow::Error,
    },
}

/// Decode, validate, persist and cache one payload.
pub async fn process_message(
    ctx: &IngestContext,
    payload: &[u8],
) -> Result<(Order, InsertOutcome), ProcessError> {
    let order: Order = serde_json::from_slice(payload)?;

    validate_order_at(&order, (ctx.clock)()).map_err(|source| ProcessError::Invalid {
        order_uid: order.order_uid.clone(),
        source,
    })?;

    let outcome = ctx
        .store
        .insert_order(&order)
        .await
        .map_err(|cause| ProcessError::Persist {
            order_uid: order.order_uid.clone(),
            cause,
        })?;

    ctx.cache.add(order.clone());
    Ok((order, outcome))
}

/// First bytes of a payload, lossily decoded, for log lines.
pub(crate) fn preview(payload: &[u8]) -> String {
    const MAX: usize = 256;
    let cut = payload.len().min(MAX);
    let mut s = String::from_utf8_lossy(&payload[..cut]).into_owned();
    if payload.len() > MAX {
        s.push_str("...");
    }
    s
}
