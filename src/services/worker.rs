//! Execution side of the job lifecycle.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

use crate::config::Settings;
use crate::models::job::{Job, JobUpdate};
use crate::models::provider::ProviderOverrides;
use crate::services::queue::{Broker, QueueError, QueuedJob};
use crate::services::registry::ProviderRegistry;
use crate::services::store::{ResultStore, StoreError};

const RECORD_ATTEMPTS: u32 = 3;
const RECORD_BACKOFF: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Sleep between polls of an empty queue
    pub poll_interval: Duration,
    /// Upper bound on a single provider invocation
    pub job_timeout: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            job_timeout: Duration::from_secs(120),
        }
    }
}

/// Shared dependencies of every worker slot.
#[derive(Clone)]
pub struct WorkerContext {
    pub broker: Arc<dyn Broker>,
    pub store: Arc<dyn ResultStore>,
    pub registry: Arc<ProviderRegistry>,
    pub settings: Arc<Settings>,
    pub options: WorkerOptions,
}

/// How a dequeued message ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
    /// Job was already started or finished elsewhere; message dropped.
    Skipped,
}

/// A single worker slot: one job at a time, start to finish.
pub struct Worker {
    id: usize,
    ctx: WorkerContext,
}

impl Worker {
    pub fn new(id: usize, ctx: WorkerContext) -> Self {
        Self { id, ctx }
    }

    /// Poll until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(worker = self.id, "Worker started");

        // a dropped sender also means stop
        while !*shutdown.borrow() && shutdown.has_changed().is_ok() {
            match self.process_next_job().await {
                Ok(Some(_)) => {
                    tracing::debug!(worker = self.id, "Job processed, checking for next job");
                }
                Ok(None) => {
                    tracing::trace!(worker = self.id, "No jobs available, sleeping");
                    self.idle(&mut shutdown).await;
                }
                Err(e) => {
                    tracing::error!(worker = self.id, error = %e, "Error processing job, will retry");
                    self.idle(&mut shutdown).await;
                }
            }
        }

        tracing::info!(worker = self.id, "Worker stopped");
    }

    async fn idle(&self, shutdown: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = sleep(self.ctx.options.poll_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    /// Take one message and drive its job to a terminal state.
    ///
    /// Returns `Ok(None)` when the queue is empty. Errors are infrastructure
    /// failures (broker or store); provider failures become FAILED jobs.
    pub async fn process_next_job(&self) -> Result<Option<Outcome>, WorkerError> {
        let Some(message) = self.ctx.broker.dequeue().await? else {
            return Ok(None);
        };

        tracing::info!(
            worker = self.id,
            job_id = %message.job_id,
            provider = %message.provider_name,
            "Processing content job"
        );

        match self.ctx.store.transition(message.job_id, JobUpdate::started()).await {
            Ok(_) => {}
            Err(StoreError::Transition(e)) => {
                tracing::warn!(job_id = %message.job_id, error = %e, "Job already picked up, dropping duplicate delivery");
                self.ctx.broker.complete(&message).await?;
                return Ok(Some(Outcome::Skipped));
            }
            Err(StoreError::NotFound(id)) => {
                tracing::error!(job_id = %id, "No job record for message, dropping");
                self.ctx.broker.complete(&message).await?;
                return Ok(Some(Outcome::Skipped));
            }
            Err(e) => return Err(e.into()),
        }

        let start = Instant::now();
        let update = self.execute(&message).await;
        let mut outcome = if update.result.is_some() {
            Outcome::Completed
        } else {
            Outcome::Failed
        };
        let elapsed = start.elapsed();

        let recorded = match self.record(message.job_id, update).await {
            Err(e @ (StoreError::Transition(_) | StoreError::NotFound(_))) => Err(e),
            Err(e) => {
                tracing::error!(job_id = %message.job_id, error = %e, "Could not record job outcome, marking failed");
                outcome = Outcome::Failed;
                self.record(
                    message.job_id,
                    JobUpdate::failed(format!("Failed to record job outcome: {e}")),
                )
                .await
            }
            ok => ok,
        };

        // The message is acknowledged whether or not the outcome was stored.
        self.ctx.broker.complete(&message).await?;

        let job = match recorded {
            Ok(job) => job,
            Err(StoreError::Transition(e)) => {
                tracing::warn!(job_id = %message.job_id, error = %e, "Job finished elsewhere, discarding outcome");
                return Ok(Some(Outcome::Skipped));
            }
            Err(StoreError::NotFound(id)) => {
                tracing::error!(job_id = %id, "Job record disappeared before completion");
                return Ok(Some(Outcome::Skipped));
            }
            Err(e) => return Err(e.into()),
        };

        metrics::histogram!("content_generation_seconds").record(elapsed.as_secs_f64());
        match outcome {
            Outcome::Completed => {
                metrics::counter!("content_jobs_completed_total").increment(1);
                tracing::info!(
                    job_id = %job.id,
                    model = job.model_name_used.as_deref().unwrap_or_default(),
                    latency_ms = elapsed.as_millis() as u64,
                    "Job completed successfully"
                );
            }
            _ => {
                metrics::counter!("content_jobs_failed_total").increment(1);
                tracing::warn!(
                    job_id = %job.id,
                    error = job.error.as_deref().unwrap_or_default(),
                    latency_ms = elapsed.as_millis() as u64,
                    "Job failed"
                );
            }
        }

        Ok(Some(outcome))
    }

    /// Write a terminal update, retrying transient store failures.
    async fn record(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        let mut attempt = 1;
        loop {
            match self.ctx.store.transition(id, update.clone()).await {
                Ok(job) => return Ok(job),
                Err(e @ (StoreError::Transition(_) | StoreError::NotFound(_))) => return Err(e),
                Err(e) if attempt >= RECORD_ATTEMPTS => return Err(e),
                Err(e) => {
                    tracing::warn!(job_id = %id, attempt, error = %e, "Store write failed, retrying");
                    sleep(RECORD_BACKOFF * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Resolve and run the provider, folding every failure into an update.
    async fn execute(&self, message: &QueuedJob) -> JobUpdate {
        let provider = match self.ctx.registry.get(
            &message.provider_name,
            self.ctx.settings.mock_mode,
            &self.ctx.settings,
            &ProviderOverrides::default(),
        ) {
            Ok(p) => p,
            Err(e) => return JobUpdate::failed(e.to_string()),
        };

        // Separate task so a panicking provider fails only this job.
        let request = message.request.clone();
        let timeout = self.ctx.options.job_timeout;
        let task = tokio::spawn(async move {
            tokio::time::timeout(timeout, provider.generate_content(&request)).await
        });

        match task.await {
            Ok(Ok(Ok((content, model_name)))) => JobUpdate::succeeded(content, model_name),
            Ok(Ok(Err(e))) => JobUpdate::failed(e.to_string()),
            Ok(Err(_elapsed)) => {
                JobUpdate::failed(format!("Content generation timed out after {timeout:?}"))
            }
            Err(join_err) => JobUpdate::failed(format!("Content generation aborted: {join_err}")),
        }
    }
}

/// A fixed set of workers sharing one context.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    pub fn spawn(size: usize, ctx: WorkerContext) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let handles = (0..size)
            .map(|id| tokio::spawn(Worker::new(id, ctx.clone()).run(rx.clone())))
            .collect();
        tracing::info!(workers = size, "Worker pool started");
        Self { handles, shutdown }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Signal every worker and wait for in-flight jobs to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task ended abnormally");
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::{ContentRequest, GeneratedContent, GenerationConfig, SellerInputs};
    use crate::models::job::JobStatus;
    use crate::services::providers::gemini::RemoteOptions;
    use crate::services::providers::mock::MockProvider;
    use crate::services::providers::{ContentProvider, GenerationError};
    use crate::services::queue::InMemoryBroker;
    use crate::services::store::InMemoryResultStore;
    use async_trait::async_trait;
    use reqwest::Client;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(item: &str) -> ContentRequest {
        ContentRequest {
            image_url: "http://x/img.png".to_string(),
            seller_inputs: SellerInputs {
                item_name: item.to_string(),
                materials: "terracotta".to_string(),
                inspiration: "rain".to_string(),
                category: "Pottery".to_string(),
            },
            generation_config: GenerationConfig {
                tone: "evocative".to_string(),
                language: "en-IN".to_string(),
                target_platform: "web".to_string(),
            },
        }
    }

    struct Panicky;

    #[async_trait]
    impl ContentProvider for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn generate_content(
            &self,
            _request: &ContentRequest,
        ) -> Result<(GeneratedContent, String), GenerationError> {
            panic!("provider bug")
        }
    }

    struct Stalled;

    #[async_trait]
    impl ContentProvider for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn generate_content(
            &self,
            _request: &ContentRequest,
        ) -> Result<(GeneratedContent, String), GenerationError> {
            sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn context() -> (WorkerContext, Arc<InMemoryBroker>, Arc<InMemoryResultStore>) {
        let broker = Arc::new(InMemoryBroker::new());
        let store = Arc::new(InMemoryResultStore::new());
        let registry = ProviderRegistry::with_defaults(Client::new(), RemoteOptions::default());
        registry.register("mock", |_| {
            Ok(Arc::new(MockProvider::with_latency(Duration::ZERO)) as Arc<dyn ContentProvider>)
        });
        registry.register("panicky", |_| Ok(Arc::new(Panicky) as Arc<dyn ContentProvider>));
        registry.register("stalled", |_| Ok(Arc::new(Stalled) as Arc<dyn ContentProvider>));

        let ctx = WorkerContext {
            broker: broker.clone(),
            store: store.clone(),
            registry: Arc::new(registry),
            settings: Arc::new(Settings::default()),
            options: WorkerOptions {
                poll_interval: Duration::from_millis(10),
                job_timeout: Duration::from_millis(200),
            },
        };
        (ctx, broker, store)
    }

    /// Rejects updates carrying a result until `failures` runs out.
    struct FlakyStore {
        inner: InMemoryResultStore,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl ResultStore for FlakyStore {
        async fn create(&self, job: &Job) -> Result<bool, StoreError> {
            self.inner.create(job).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
            self.inner.get(id).await
        }

        async fn transition(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
            let failing = update.result.is_some()
                && self
                    .failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
            if failing {
                return Err(StoreError::Conflict(id));
            }
            self.inner.transition(id, update).await
        }

        async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete(id).await
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn flaky_context(failures: usize) -> (WorkerContext, Arc<InMemoryBroker>, Arc<FlakyStore>) {
        let (ctx, broker, _) = context();
        let store = Arc::new(FlakyStore {
            inner: InMemoryResultStore::new(),
            failures: AtomicUsize::new(failures),
        });
        let ctx = WorkerContext {
            store: store.clone(),
            ..ctx
        };
        (ctx, broker, store)
    }

    async fn seed(
        broker: &InMemoryBroker,
        store: &InMemoryResultStore,
        provider: &str,
        item: &str,
    ) -> Uuid {
        let id = Uuid::new_v4();
        store
            .create(&Job::new(id, request(item), provider))
            .await
            .unwrap();
        broker
            .enqueue(&QueuedJob {
                job_id: id,
                request: request(item),
                provider_name: provider.to_string(),
            })
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let (ctx, _, _) = context();
        assert_eq!(Worker::new(0, ctx).process_next_job().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_success_writes_result_and_model() {
        let (ctx, broker, store) = context();
        let id = seed(&broker, &store, "mock", "Clay Pot").await;

        let worker = Worker::new(0, ctx);
        assert_eq!(
            worker.process_next_job().await.unwrap(),
            Some(Outcome::Completed)
        );

        let job = store.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.model_name_used.as_deref(), Some("mock-model-v1.0"));
        assert!(job.result.is_some());
        assert!(job.error.is_none());
        assert_eq!(broker.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let (ctx, broker, store) = context();
        let bad = seed(&broker, &store, "mock", " ").await;
        let panicked = seed(&broker, &store, "panicky", "Clay Pot").await;
        let stalled = seed(&broker, &store, "stalled", "Clay Pot").await;
        let good = seed(&broker, &store, "mock", "Clay Pot").await;

        let worker = Worker::new(0, ctx);
        for _ in 0..3 {
            assert_eq!(worker.process_next_job().await.unwrap(), Some(Outcome::Failed));
        }
        assert_eq!(
            worker.process_next_job().await.unwrap(),
            Some(Outcome::Completed)
        );

        for id in [bad, panicked, stalled] {
            let job = store.get(id).await.unwrap().unwrap();
            assert_eq!(job.status, JobStatus::Failed);
            assert!(!job.error.unwrap().is_empty());
            assert!(job.result.is_none());
        }
        let stalled_job = store.get(stalled).await.unwrap().unwrap();
        assert!(stalled_job.error.unwrap().contains("timed out"));
        assert_eq!(
            store.get(good).await.unwrap().unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_skipped() {
        let (ctx, broker, store) = context();
        let id = seed(&broker, &store, "mock", "Clay Pot").await;
        let worker = Worker::new(0, ctx);
        worker.process_next_job().await.unwrap();
        let finished = store.get(id).await.unwrap().unwrap();

        // a redelivered copy bypassing broker dedup
        let inner = InMemoryBroker::new();
        inner
            .enqueue(&QueuedJob {
                job_id: id,
                request: request("Clay Pot"),
                provider_name: "mock".to_string(),
            })
            .await
            .unwrap();
        let redelivery = Worker::new(
            1,
            WorkerContext {
                broker: Arc::new(inner),
                ..worker.ctx.clone()
            },
        );
        assert_eq!(
            redelivery.process_next_job().await.unwrap(),
            Some(Outcome::Skipped)
        );
        assert_eq!(store.get(id).await.unwrap().unwrap(), finished);
    }

    #[tokio::test]
    async fn test_transient_store_error_on_completion_is_retried() {
        let (ctx, broker, store) = flaky_context(1);
        let id = seed(&broker, &store.inner, "mock", "Clay Pot").await;

        let worker = Worker::new(0, ctx);
        assert_eq!(
            worker.process_next_job().await.unwrap(),
            Some(Outcome::Completed)
        );

        let job = store.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
        assert_eq!(store.failures.load(Ordering::SeqCst), 0);
        assert_eq!(broker.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_unrecordable_result_fails_job_and_acks() {
        let (ctx, broker, store) = flaky_context(usize::MAX);
        let id = seed(&broker, &store.inner, "mock", "Clay Pot").await;

        let worker = Worker::new(0, ctx);
        assert_eq!(
            worker.process_next_job().await.unwrap(),
            Some(Outcome::Failed)
        );

        let job = store.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.is_none());
        assert!(job.error.unwrap().contains("Failed to record job outcome"));
        assert_eq!(broker.in_flight().await, 0);
        assert_eq!(worker.process_next_job().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pool_drains_queue_and_stops() {
        let (ctx, broker, store) = context();
        let mut ids = Vec::new();
        for i in 0..6 {
            ids.push(seed(&broker, &store, "mock", &format!("Pot {i}")).await);
        }

        let pool = WorkerPool::spawn(3, ctx);
        assert_eq!(pool.size(), 3);

        for _ in 0..200 {
            let mut done = 0;
            for id in &ids {
                if store.get(*id).await.unwrap().unwrap().status.is_terminal() {
                    done += 1;
                }
            }
            if done == ids.len() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        pool.shutdown().await;

        for id in ids {
            assert_eq!(
                store.get(id).await.unwrap().unwrap().status,
                JobStatus::Completed
            );
        }
    }
}
