use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use craft_content_gen::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::{
        queue::{Broker, InMemoryBroker, RedisBroker},
        registry::ProviderRegistry,
        store::{InMemoryResultStore, RedisResultStore, ResultStore},
        worker::{WorkerContext, WorkerOptions, WorkerPool},
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");
    let settings = Arc::new(config.settings());

    tracing::info!(
        default_provider = %settings.default_provider,
        mock_mode = settings.mock_mode,
        "Initializing craft-content-gen server"
    );

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe();

    let (broker, store): (Arc<dyn Broker>, Arc<dyn ResultStore>) = match &config.redis_url {
        Some(url) => {
            tracing::info!("Connecting to Redis broker and result store");
            let broker = RedisBroker::new(url, config.result_ttl_secs)
                .expect("Failed to initialize job queue");
            let store = RedisResultStore::new(url, config.result_ttl_secs)
                .expect("Failed to initialize result store");
            (Arc::new(broker), Arc::new(store))
        }
        None => {
            tracing::warn!("REDIS_URL not set, jobs are kept in memory and lost on restart");
            (
                Arc::new(InMemoryBroker::with_dedup_ttl(Duration::from_secs(
                    config.result_ttl_secs,
                ))),
                Arc::new(InMemoryResultStore::new()),
            )
        }
    };

    let http = reqwest::Client::new();
    let registry = Arc::new(ProviderRegistry::with_defaults(
        http,
        config.remote_options(),
    ));
    tracing::info!(providers = ?registry.list(), "Provider registry ready");

    let state = AppState::new(settings.clone(), registry.clone(), broker.clone(), store.clone());

    let workers = config.embedded_worker_count();
    let pool = (workers > 0).then(|| {
        WorkerPool::spawn(
            workers,
            WorkerContext {
                broker,
                store,
                registry,
                settings,
                options: WorkerOptions {
                    poll_interval: config.poll_interval(),
                    job_timeout: config.job_timeout(),
                },
            },
        )
    });

    let app = routes::router(state, Some(prometheus_handle));

    tracing::info!("Starting craft-content-gen on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    if let Some(pool) = pool {
        tracing::info!("Waiting for embedded workers to finish");
        pool.shutdown().await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
