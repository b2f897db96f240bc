//! Durable order storage.
//!
//! [`OrderStore`] is the contract the ingestion pipeline, the cache warm-start
//! and the read path consume; [`PgOrderStore`] is the PostgreSQL implementation.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

mod orders;
mod store;

pub use orders::PgOrderStore;
pub use sqlx::PgPool;
pub use store::{InsertOutcome, OrderStore};

/// Database URL the integration tests read; they skip when it is unset.
pub const ENV_DB_URL: &str = "ORDS_DATABASE_URL";

/// Connect to Postgres with an explicit URL (resolved by `ords-config`).
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Connectivity + schema presence + row count.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    let order_count = if exists {
        let (n,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*)::bigint from orders")
            .fetch_one(pool)
            .await
            .context("status order count failed")?;
        n
    } else {
        0
    };

    Ok(DbStatus {
        ok: one == 1,
        has_orders_table: exists,
        order_count,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
    pub order_count: i64,
}
