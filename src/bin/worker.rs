use craft_content_gen::{
    config::AppConfig,
    services::{
        queue::RedisBroker,
        registry::ProviderRegistry,
        store::RedisResultStore,
        worker::{WorkerContext, WorkerOptions, WorkerPool},
    },
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting content generation worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");
    let Some(redis_url) = config.redis_url.as_deref() else {
        tracing::error!("REDIS_URL is required to run a standalone worker");
        std::process::exit(1);
    };

    tracing::info!("Connecting to Redis");
    let broker =
        RedisBroker::new(redis_url, config.result_ttl_secs).expect("Failed to initialize job queue");
    let store = RedisResultStore::new(redis_url, config.result_ttl_secs)
        .expect("Failed to initialize result store");

    let settings = Arc::new(config.settings());
    let registry = ProviderRegistry::with_defaults(reqwest::Client::new(), config.remote_options());

    tracing::info!(
        workers = config.worker_concurrency,
        mock_mode = settings.mock_mode,
        providers = ?registry.list(),
        "Worker ready, starting job processing loop"
    );

    let pool = WorkerPool::spawn(
        config.worker_concurrency.max(1),
        WorkerContext {
            broker: Arc::new(broker),
            store: Arc::new(store),
            registry: Arc::new(registry),
            settings,
            options: WorkerOptions {
                poll_interval: config.poll_interval(),
                job_timeout: config.job_timeout(),
            },
        },
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, draining workers");
    pool.shutdown().await;
}
