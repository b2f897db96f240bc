//! ords-daemon entry point.
//!
//! Boot order: config, secrets, Postgres (+ migrations), cache warm-start,
//! Kafka consumer, HTTP server. A failure anywhere before the server starts
//! aborts the process. A fatal ingestion error shuts the server down and the
//! process exits non-zero.

use std::sync::Arc;

use anyhow::Context;
use ords_cache::{warm_start, OrderCache};
use ords_daemon::{routes, state::AppState};
use ords_db::{OrderStore, PgOrderStore};
use ords_ingest::{spawn_ingest, IngestContext, IngestCounters, KafkaSource};
use tokio_util::sync::CancellationToken;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = ords_config::config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let (loaded, cfg) =
        ords_config::load_service_config(&path_refs).context("config load failed")?;
    info!(config_hash = %loaded.config_hash, ?paths, "config loaded");

    let secrets = ords_config::resolve_secrets(&cfg)?;

    let pool = ords_db::connect(&secrets.database_url, cfg.postgres.max_connections).await?;
    ords_db::migrate(&pool).await?;
    let store: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(pool));

    let cache = Arc::new(OrderCache::new(cfg.cache.capacity)?);
    warm_start(&*store, &cache)
        .await
        .context("cache warm-start failed")?;

    let counters = Arc::new(IngestCounters::default());
    let source = KafkaSource::from_config(&cfg.kafka)?;
    let ctx = IngestContext::new(Arc::clone(&store), Arc::clone(&cache))
        .with_recv_error_pause(cfg.ingest.recv_error_pause())
        .with_counters(Arc::clone(&counters));

    let shutdown = CancellationToken::new();
    let ingest = spawn_ingest(source, ctx, shutdown.child_token());

    // Whatever ends ingestion also ends the HTTP server.
    let ingest_done = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let res = ingest.join().await;
            shutdown.cancel();
            res
        })
    };

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("ctrl-c received; shutting down");
                    shutdown.cancel();
                }
                Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
            }
        });
    }

    let state = Arc::new(AppState::new(cache, store, counters).with_config_hash(loaded.config_hash));

    let app = routes::build_router(state)
        .layer(TimeoutLayer::new(cfg.http_server.timeout()))
        .layer(CatchPanicLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(routes::cors_layer());

    let addr = cfg.http_server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("ords-daemon listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .context("server crashed")?;

    shutdown.cancel();
    match ingest_done.await.context("ingest watcher panicked")? {
        Ok(stats) => {
            info!(?stats, "ingestion stopped");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("ingestion terminated")),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
