use std::net::SocketAddr;

use anyhow::{Context, anyhow};
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use slate::router::init_router;
use slate::state::init_app_state;
use slate_cache::{CacheConfig, RedisCache};
use slate_config::ServerConfig;
use slate_db::{init_db_pool, run_migrations};
use slate_observability::{init_metrics_routes, init_tracing, shutdown_tracer};

async fn init_cache() -> Option<RedisCache> {
    let config = CacheConfig::from_env();
    if !config.enabled {
        info!("Cache disabled");
        return None;
    }

    match RedisCache::new(&config.redis_url, config.default_ttl()).await {
        Ok(cache) => {
            info!("Connected to Redis");
            Some(cache)
        }
        Err(e) => {
            warn!(error = %e, "Redis unavailable, running without cache");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = init_db_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache = init_cache().await;
    let (state, worker) = init_app_state(pool, cache)
        .await
        .map_err(|e| anyhow!("Failed to initialise application state: {e}"))?;

    let worker_shutdown = CancellationToken::new();
    let worker_handle = tokio::spawn(worker.run(worker_shutdown.clone()));

    let mut app = init_router(state);
    if let Some(metrics) = init_metrics_routes() {
        app = app.merge(metrics);
    }

    let server_config = ServerConfig::from_env();
    let listener = tokio::net::TcpListener::bind(server_config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", server_config.bind_addr()))?;
    info!(port = server_config.port, "Server running");
    info!("OpenAPI document at /api-docs/openapi.json");

    // Peer address is the rate limit key when no forwarding header is present.
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    // Requests have drained; the worker still runs every job they queued.
    worker_shutdown.cancel();
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "Task worker ended abnormally");
    }
    shutdown_tracer().await;

    served.context("Server error")
}
