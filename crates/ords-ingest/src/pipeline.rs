use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ords_cache::OrderCache;
use ords_db::{InsertOutcome, OrderStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::process::{preview, process_message, ProcessError};
use crate::source::{MessageSource, SourceError};

/// Shared handles the loop works against.
#[derive(Clone)]
pub struct IngestContext {
    pub store: Arc<dyn OrderStore>,
    pub cache: Arc<OrderCache>,
    /// "Now" for the `date_created` future check.
    pub clock: fn() -> DateTime<Utc>,
    pub recv_error_pause: Duration,
    pub counters: Arc<IngestCounters>,
}

impl IngestContext {
    pub fn new(store: Arc<dyn OrderStore>, cache: Arc<OrderCache>) -> Self {
        Self {
            store,
            cache,
            clock: Utc::now,
            recv_error_pause: Duration::from_secs(1),
            counters: Arc::new(IngestCounters::default()),
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_recv_error_pause(mut self, pause: Duration) -> Self {
        self.recv_error_pause = pause;
        self
    }

    pub fn with_counters(mut self, counters: Arc<IngestCounters>) -> Self {
        self.counters = counters;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub received: u64,
    pub decode_failed: u64,
    pub invalid: u64,
    pub persist_failed: u64,
    pub processed: u64,
    /// Processed messages whose order was already stored.
    pub duplicates: u64,
    pub commit_failed: u64,
    pub source_errors: u64,
}

/// Live, lock-free view of [`IngestStats`] shared with the status endpoint.
#[derive(Debug, Default)]
pub struct IngestCounters {
    received: AtomicU64,
    decode_failed: AtomicU64,
    invalid: AtomicU64,
    persist_failed: AtomicU64,
    processed: AtomicU64,
    duplicates: AtomicU64,
    commit_failed: AtomicU64,
    source_errors: AtomicU64,
}

impl IngestCounters {
    pub fn snapshot(&self) -> IngestStats {
        IngestStats {
            received: self.received.load(Ordering::Relaxed),
            decode_failed: self.decode_failed.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            persist_failed: self.persist_failed.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            commit_failed: self.commit_failed.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
        }
    }
}

fn bump(c: &AtomicU64) {
    c.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("message source failed: {0}")]
    Source(String),

    #[error("ingest task did not complete: {0}")]
    Task(String),
}

/// Consume `source` until it closes, fails fatally, or `cancel` fires.
///
/// A message is committed only after its order has been persisted; messages
/// that fail to decode, validate or persist are logged, counted and left
/// uncommitted. Returns a snapshot of `ctx.counters` on a normal exit.
pub async fn run_ingest_loop<S: MessageSource>(
    source: &mut S,
    ctx: &IngestContext,
    cancel: &CancellationToken,
) -> Result<IngestStats, IngestError> {
    let counters = &*ctx.counters;
    info!("ingestion loop started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = source.next() => next,
        };

        let msg = match next {
            Ok(msg) => msg,
            Err(SourceError::Closed) => {
                info!("message source closed");
                break;
            }
            Err(SourceError::Fatal(reason)) => {
                bump(&counters.source_errors);
                error!(%reason, "message source failed; stopping ingestion");
                return Err(IngestError::Source(reason));
            }
            Err(SourceError::Transient(reason)) => {
                bump(&counters.source_errors);
                warn!(%reason, pause_ms = ctx.recv_error_pause.as_millis() as u64, "receive failed; retrying");
                let cancelled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(ctx.recv_error_pause) => false,
                };
                if cancelled {
                    break;
                }
                continue;
            }
        };

        bump(&counters.received);

        match process_message(ctx, &msg.payload).await {
            Ok((order, outcome)) => {
                bump(&counters.processed);
                if outcome == InsertOutcome::AlreadyPresent {
                    bump(&counters.duplicates);
                }
                debug!(order_uid = %order.order_uid, ?outcome, "order processed");

                if let Err(e) = source.commit(&msg.handle).await {
                    bump(&counters.commit_failed);
                    warn!(order_uid = %order.order_uid, error = %e, "offset commit failed");
                }
            }
            Err(ProcessError::Decode(e)) => {
                bump(&counters.decode_failed);
                warn!(error = %e, payload = %preview(&msg.payload), "dropping undecodable message");
            }
            Err(ProcessError::Invalid { order_uid, source: reason }) => {
                bump(&counters.invalid);
                warn!(%order_uid, field = reason.field(), %reason, "dropping invalid order");
            }
            Err(e @ ProcessError::Persist { .. }) => {
                bump(&counters.persist_failed);
                error!(error = %e, "order not persisted; leaving message uncommitted");
            }
        }
    }

    let stats = counters.snapshot();
    info!(?stats, "ingestion loop stopped");
    Ok(stats)
}
