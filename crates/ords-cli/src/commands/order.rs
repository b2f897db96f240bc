use anyhow::{bail, Context, Result};
use ords_db::{OrderStore, PgOrderStore, PgPool};
use ords_schemas::Order;

use super::read_text_file;

/// Decode and validate an order document without touching the database.
pub fn validate_file(path: &str) -> Result<()> {
    let raw = read_text_file(path)?;
    let order: Order =
        serde_json::from_str(raw.trim()).context("file is not a valid order document")?;

    if let Err(e) = ords_validate::validate_order(&order) {
        bail!(
            "ORDER_INVALID order_uid={:?} field={} reason={}",
            order.order_uid,
            e.field(),
            e
        );
    }

    println!("valid=true order_uid={}", order.order_uid);
    Ok(())
}

pub async fn show(pool: PgPool, order_uid: &str) -> Result<()> {
    let store = PgOrderStore::new(pool);
    let Some(order) = store.fetch_order(order_uid).await? else {
        bail!("order {order_uid} not found");
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&order).context("order serialize failed")?
    );
    Ok(())
}

pub async fn recent(pool: PgPool, limit: usize) -> Result<()> {
    let store = PgOrderStore::new(pool);
    let orders = store.fetch_last_orders(limit).await?;
    for o in &orders {
        println!(
            "{} date_created={} items={} amount={} {}",
            o.order_uid,
            o.date_created.map(|t| t.to_rfc3339()).unwrap_or_default(),
            o.items.len(),
            o.payment.amount,
            o.payment.currency
        );
    }
    println!("count={}", orders.len());
    Ok(())
}
