//! Order persistence on PostgreSQL.
//!
//! - Writes: one transaction per order; every statement is `on conflict do nothing`
//!   so redelivered messages are no-ops. Whether the header row was new decides
//!   the reported InsertOutcome.
//! - Reads: header, delivery, payment and items are read inside one transaction
//!   so a reader never sees a half-hydrated order. Batch reads load children
//!   with `= any($1)` instead of one query per order.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ords_schemas::{Delivery, Item, Order, Payment};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use tracing::debug;

use crate::store::{InsertOutcome, OrderStore};

const ORDER_COLUMNS: &str = r#"
    order_uid, track_number, entry, locale, internal_signature,
    customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard
"#;

const DELIVERY_COLUMNS: &str = "order_uid, name, phone, zip, city, address, region, email";

const PAYMENT_COLUMNS: &str = r#"
    order_uid, transaction, request_id, currency, provider, amount,
    payment_dt, bank, delivery_cost, goods_total, custom_fee
"#;

const ITEM_COLUMNS: &str = r#"
    order_uid, chrt_id, track_number, price, rid, name,
    sale, size, total_price, nm_id, brand, status
"#;

/// [`OrderStore`] backed by a shared `PgPool`.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert_order(&self, order: &Order) -> Result<InsertOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("insert_order begin tx failed")?;

        let header = sqlx::query(
            r#"
            insert into orders (
              order_uid, track_number, entry, locale, internal_signature,
              customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard
            ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            on conflict (order_uid) do nothing
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shard_key)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await
        .context("insert into orders failed")?;

        let d = &order.delivery;
        sqlx::query(
            r#"
            insert into delivery (
              order_uid, name, phone, zip, city, address, region, email
            ) values ($1, $2, $3, $4, $5, $6, $7, $8)
            on conflict (order_uid) do nothing
            "#,
        )
        .bind(&order.order_uid)
        .bind(&d.name)
        .bind(&d.phone)
        .bind(&d.zip)
        .bind(&d.city)
        .bind(&d.address)
        .bind(&d.region)
        .bind(&d.email)
        .execute(&mut *tx)
        .await
        .context("insert into delivery failed")?;

        let p = &order.payment;
        sqlx::query(
            r#"
            insert into payment (
              order_uid, transaction, request_id, currency, provider, amount,
              payment_dt, bank, delivery_cost, goods_total, custom_fee
            ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            on conflict (order_uid) do nothing
            "#,
        )
        .bind(&order.order_uid)
        .bind(&p.transaction)
        .bind(&p.request_id)
        .bind(&p.currency)
        .bind(&p.provider)
        .bind(p.amount)
        .bind(p.payment_dt)
        .bind(&p.bank)
        .bind(p.delivery_cost)
        .bind(p.goods_total)
        .bind(p.custom_fee)
        .execute(&mut *tx)
        .await
        .context("insert into payment failed")?;

        for item in &order.items {
            sqlx::query(
                r#"
                insert into items (
                  order_uid, chrt_id, track_number, price, rid, name,
                  sale, size, total_price, nm_id, brand, status
                ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                on conflict (order_uid, chrt_id) do nothing
                "#,
            )
            .bind(&order.order_uid)
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("insert into items failed (chrt_id={})", item.chrt_id))?;
        }

        tx.commit().await.context("insert_order commit failed")?;

        let outcome = if header.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyPresent
        };
        debug!(order_uid = %order.order_uid, ?outcome, "insert_order");
        Ok(outcome)
    }

    async fn fetch_order(&self, order_uid: &str) -> Result<Option<Order>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("fetch_order begin tx failed")?;

        let row = sqlx::query(&format!(
            "select {ORDER_COLUMNS} from orders where order_uid = $1"
        ))
        .bind(order_uid)
        .fetch_optional(&mut *tx)
        .await
        .context("fetch_order header query failed")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let header = order_from_row(&row)?;
        let mut orders = hydrate(&mut tx, vec![header]).await?;
        tx.commit().await.context("fetch_order commit failed")?;

        Ok(orders.pop())
    }

    async fn fetch_last_orders(&self, limit: usize) -> Result<Vec<Order>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut tx = self
            .pool
            .begin()
            .await
            .context("fetch_last_orders begin tx failed")?;

        let rows = sqlx::query(&format!(
            "select {ORDER_COLUMNS} from orders order by date_created desc, order_uid asc limit $1"
        ))
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .context("fetch_last_orders header query failed")?;

        let headers = rows
            .iter()
            .map(order_from_row)
            .collect::<Result<Vec<_>>>()?;

        let orders = hydrate(&mut tx, headers).await?;
        tx.commit().await.context("fetch_last_orders commit failed")?;

        Ok(orders)
    }
}

/// Attach delivery, payment and items to each header, preserving header order.
async fn hydrate(conn: &mut PgConnection, mut orders: Vec<Order>) -> Result<Vec<Order>> {
    if orders.is_empty() {
        return Ok(orders);
    }

    let uids: Vec<String> = orders.iter().map(|o| o.order_uid.clone()).collect();

    let mut deliveries: HashMap<String, Delivery> = HashMap::with_capacity(uids.len());
    let rows = sqlx::query(&format!(
        "select {DELIVERY_COLUMNS} from delivery where order_uid = any($1)"
    ))
    .bind(&uids[..])
    .fetch_all(&mut *conn)
    .await
    .context("delivery query failed")?;
    for row in &rows {
        deliveries.insert(row.try_get("order_uid")?, delivery_from_row(row)?);
    }

    let mut payments: HashMap<String, Payment> = HashMap::with_capacity(uids.len());
    let rows = sqlx::query(&format!(
        "select {PAYMENT_COLUMNS} from payment where order_uid = any($1)"
    ))
    .bind(&uids[..])
    .fetch_all(&mut *conn)
    .await
    .context("payment query failed")?;
    for row in &rows {
        payments.insert(row.try_get("order_uid")?, payment_from_row(row)?);
    }

    let mut items: HashMap<String, Vec<Item>> = HashMap::with_capacity(uids.len());
    let rows = sqlx::query(&format!(
        "select {ITEM_COLUMNS} from items where order_uid = any($1) order by id asc"
    ))
    .bind(&uids[..])
    .fetch_all(&mut *conn)
    .await
    .context("items query failed")?;
    for row in &rows {
        let uid: String = row.try_get("order_uid")?;
        items.entry(uid).or_default().push(item_from_row(row)?);
    }

    for o in orders.iter_mut() {
        o.delivery = deliveries
            .remove(&o.order_uid)
            .ok_or_else(|| anyhow!("order {} has no delivery row", o.order_uid))?;
        o.payment = payments
            .remove(&o.order_uid)
            .ok_or_else(|| anyhow!("order {} has no payment row", o.order_uid))?;
        o.items = items.remove(&o.order_uid).unwrap_or_default();
    }

    Ok(orders)
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    Ok(Order {
        order_uid: row.try_get("order_uid")?,
        track_number: row.try_get("track_number")?,
        entry: row.try_get("entry")?,
        delivery: Delivery::default(),
        payment: Payment::default(),
        items: Vec::new(),
        locale: row.try_get("locale")?,
        internal_signature: row.try_get("internal_signature")?,
        customer_id: row.try_get("customer_id")?,
        delivery_service: row.try_get("delivery_service")?,
        shard_key: row.try_get("shardkey")?,
        sm_id: row.try_get("sm_id")?,
        date_created: row.try_get("date_created")?,
        oof_shard: row.try_get("oof_shard")?,
    })
}

fn delivery_from_row(row: &PgRow) -> Result<Delivery> {
    Ok(Delivery {
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        zip: row.try_get("zip")?,
        city: row.try_get("city")?,
        address: row.try_get("address")?,
        region: row.try_get("region")?,
        email: row.try_get("email")?,
    })
}

fn payment_from_row(row: &PgRow) -> Result<Payment> {
    Ok(Payment {
        transaction: row.try_get("transaction")?,
        request_id: row.try_get("request_id")?,
        currency: row.try_get("currency")?,
        provider: row.try_get("provider")?,
        amount: row.try_get("amount")?,
        payment_dt: row.try_get("payment_dt")?,
        bank: row.try_get("bank")?,
        delivery_cost: row.try_get("delivery_cost")?,
        goods_total: row.try_get("goods_total")?,
        custom_fee: row.try_get("custom_fee")?,
    })
}

fn item_from_row(row: &PgRow) -> Result<Item> {
    Ok(Item {
        chrt_id: row.try_get("chrt_id")?,
        track_number: row.try_get("track_number")?,
        price: row.try_get("price")?,
        rid: row.try_get("rid")?,
        name: row.try_get("name")?,
        sale: row.try_get("sale")?,
        size: row.try_get("size")?,
        total_price: row.try_get("total_price")?,
        nm_id: row.try_get("nm_id")?,
        brand: row.try_get("brand")?,
        status: row.try_get("status")?,
    })
}
