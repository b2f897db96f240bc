//! Shared runtime state for ords-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The cache, the store
//! handle and the ingest counters are the same instances the ingestion task
//! writes through.

use std::sync::Arc;

use ords_cache::OrderCache;
use ords_db::OrderStore;
use ords_ingest::IngestCounters;
use serde::{Deserialize, Serialize};

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub cache: Arc<OrderCache>,
    pub store: Arc<dyn OrderStore>,
    /// Live counters of the ingestion loop.
    pub ingest: Arc<IngestCounters>,
    /// Hash of the merged config the process booted with.
    pub config_hash: Option<String>,
}

impl AppState {
    pub fn new(
        cache: Arc<OrderCache>,
        store: Arc<dyn OrderStore>,
        ingest: Arc<IngestCounters>,
    ) -> Self {
        // Pin the uptime origin to boot rather than the first status request.
        let _ = uptime_secs();

        Self {
            build: BuildInfo {
                service: "ords-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            cache,
            store,
            ingest,
            config_hash: None,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
