//! Pipeline scenarios driven through an in-process channel source and the
//! in-memory store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use ords_cache::OrderCache;
use ords_ingest::{
    spawn_ingest, ChannelSender, ChannelSource, CommitLog, IngestContext, IngestError, IngestStats,
    SourceError,
};
use ords_testkit::{order_payload, sample_order, MemOrderStore};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    tx: ChannelSender,
    commits: CommitLog,
    store: Arc<MemOrderStore>,
    cache: Arc<OrderCache>,
    handle: ords_ingest::IngestHandle,
}

fn start(ctx_fn: impl FnOnce(IngestContext) -> IngestContext) -> Harness {
    let store = Arc::new(MemOrderStore::new());
    let cache = Arc::new(OrderCache::new(8).expect("capacity"));
    let (tx, source) = ChannelSource::new(16);
    let commits = source.commit_log();

    let ctx = ctx_fn(
        IngestContext::new(store.clone(), cache.clone())
            .with_recv_error_pause(Duration::from_millis(10)),
    );
    let handle = spawn_ingest(source, ctx, CancellationToken::new());

    Harness {
        tx,
        commits,
        store,
        cache,
        handle,
    }
}

impl Harness {
    async fn send(&self, payload: Vec<u8>) {
        self.tx.send(Ok(payload)).await.expect("loop alive");
    }

    /// Close the source and wait for the loop to drain it.
    async fn finish(self) -> (IngestStats, CommitLog, Arc<MemOrderStore>, Arc<OrderCache>) {
        drop(self.tx);
        let stats = tokio::time::timeout(WAIT, self.handle.join())
            .await
            .expect("loop should stop once the source closes")
            .expect("closed source is a normal exit");
        (stats, self.commits, self.store, self.cache)
    }
}

#[tokio::test]
async fn valid_order_is_stored_cached_and_committed() {
    let h = start(|c| c);
    h.send(order_payload(&sample_order("ok-1"))).await;

    let (stats, commits, store, cache) = h.finish().await;
    assert_eq!(stats.received, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(commits.snapshot(), vec![0]);
    assert!(store.contains("ok-1"));
    assert_eq!(cache.get("ok-1"), Some(sample_order("ok-1")));
}

#[tokio::test]
async fn malformed_payload_is_skipped_without_commit() {
    let h = start(|c| c);
    h.send(b"{not json".to_vec()).await;
    h.send(order_payload(&sample_order("after"))).await;

    let (stats, commits, store, _) = h.finish().await;
    assert_eq!(stats.decode_failed, 1);
    assert_eq!(stats.processed, 1);
    // Only the second message (seq 1) is acknowledged.
    assert_eq!(commits.snapshot(), vec![1]);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn invalid_order_is_skipped_without_commit_or_write() {
    let h = start(|c| c);
    let mut bad = sample_order("bad");
    bad.items.clear();
    h.send(order_payload(&bad)).await;

    let mut no_uid = sample_order("");
    no_uid.order_uid.clear();
    h.send(order_payload(&no_uid)).await;

    let (stats, commits, store, cache) = h.finish().await;
    assert_eq!(stats.invalid, 2);
    assert!(commits.snapshot().is_empty());
    assert_eq!(store.insert_calls(), 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn persistence_failure_leaves_message_uncommitted_and_uncached() {
    let h = start(|c| c);
    h.store.fail_inserts(true);
    h.send(order_payload(&sample_order("p-1"))).await;

    let (stats, commits, store, cache) = h.finish().await;
    assert_eq!(stats.persist_failed, 1);
    assert_eq!(stats.processed, 0);
    assert!(commits.snapshot().is_empty());
    assert!(store.is_empty());
    assert!(!cache.contains("p-1"));
}

#[tokio::test]
async fn redelivery_is_idempotent_and_each_delivery_is_committed() {
    let h = start(|c| c);
    let payload = order_payload(&sample_order("again"));
    h.send(payload.clone()).await;
    h.send(payload).await;

    let (stats, commits, store, cache) = h.finish().await;
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(commits.snapshot(), vec![0, 1]);
    assert_eq!(store.len(), 1);
    assert_eq!(cache.len(), 1);
}

fn year_2000() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[tokio::test]
async fn validation_uses_the_context_clock() {
    // The sample order is from 2021, which is "in the future" for this clock.
    let h = start(|c| c.with_clock(year_2000));
    h.send(order_payload(&sample_order("future"))).await;

    let (stats, commits, _, _) = h.finish().await;
    assert_eq!(stats.invalid, 1);
    assert!(commits.snapshot().is_empty());
}

#[tokio::test]
async fn transient_source_error_pauses_then_continues() {
    let h = start(|c| c);
    h.tx
        .send(Err(SourceError::Transient("broker unreachable".into())))
        .await
        .expect("loop alive");
    h.send(order_payload(&sample_order("t-1"))).await;

    let (stats, commits, _, _) = h.finish().await;
    assert_eq!(stats.source_errors, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(commits.snapshot(), vec![0]);
}

#[tokio::test]
async fn fatal_source_error_is_surfaced_from_join() {
    let h = start(|c| c);
    h.tx
        .send(Err(SourceError::Fatal("group coordinator fenced".into())))
        .await
        .expect("loop alive");

    let res = tokio::time::timeout(WAIT, h.handle.join())
        .await
        .expect("loop should stop on a fatal error");
    match res {
        Err(IngestError::Source(reason)) => assert!(reason.contains("fenced")),
        other => panic!("expected a source error, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_stops_a_loop_blocked_on_receive() {
    let h = start(|c| c);
    // Nothing is sent and the sender stays alive: the loop is parked in next().
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!h.handle.is_finished());

    h.handle.cancel();
    let stats = tokio::time::timeout(WAIT, h.handle.join())
        .await
        .expect("cancel should unblock the loop")
        .expect("cancellation is a normal exit");
    assert_eq!(stats, IngestStats::default());
    drop(h.tx);
}

#[tokio::test]
async fn counters_are_shared_with_the_caller() {
    let counters = Arc::new(ords_ingest::IngestCounters::default());
    let shared = counters.clone();
    let h = start(move |c| c.with_counters(shared));
    h.send(order_payload(&sample_order("c-1"))).await;
    h.send(b"\x00garbage".to_vec()).await;

    let (stats, _, _, _) = h.finish().await;
    assert_eq!(counters.snapshot(), stats);
    assert_eq!(stats.received, 2);
    assert_eq!(stats.decode_failed, 1);
}
