use ords_db::{InsertOutcome, OrderStore};
use ords_testkit::{sample_order, sample_orders, MemOrderStore};

#[tokio::test]
async fn sample_order_passes_validation() {
    ords_validate::validate_order(&sample_order("fixture")).expect("fixture must be valid");
}

#[tokio::test]
async fn insert_is_idempotent_by_order_uid() -> anyhow::Result<()> {
    let store = MemOrderStore::new();
    let o = sample_order("dup");

    assert_eq!(store.insert_order(&o).await?, InsertOutcome::Inserted);

    let mut changed = o.clone();
    changed.customer_id = "someone-else".to_string();
    assert_eq!(
        store.insert_order(&changed).await?,
        InsertOutcome::AlreadyPresent
    );

    assert_eq!(store.len(), 1);
    let got = store.fetch_order("dup").await?.expect("present");
    assert_eq!(got.customer_id, "test", "first write wins");
    Ok(())
}

#[tokio::test]
async fn last_orders_are_newest_first_and_limited() -> anyhow::Result<()> {
    let store = MemOrderStore::with_orders(sample_orders("o", 5));

    let last = store.fetch_last_orders(3).await?;
    let uids: Vec<_> = last.iter().map(|o| o.order_uid.as_str()).collect();
    assert_eq!(uids, vec!["o-4", "o-3", "o-2"]);

    assert_eq!(store.fetch_last_orders(100).await?.len(), 5);
    Ok(())
}

#[tokio::test]
async fn injected_failures_surface_as_errors() {
    let store = MemOrderStore::new();
    store.fail_inserts(true);
    assert!(store.insert_order(&sample_order("x")).await.is_err());
    assert!(store.is_empty());

    store.fail_reads(true);
    assert!(store.fetch_order("x").await.is_err());
    assert!(store.fetch_last_orders(1).await.is_err());
    assert_eq!(store.insert_calls(), 1);
    assert_eq!(store.fetch_calls(), 1);
}
