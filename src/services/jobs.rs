//! Submission and polling side of the job lifecycle.

use garde::Validate;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Settings;
use crate::models::content::ContentRequest;
use crate::models::job::Job;
use crate::models::provider::ProviderOverrides;
use crate::services::queue::{Broker, QueueError, QueuedJob};
use crate::services::registry::{ProviderError, ProviderRegistry};
use crate::services::store::{ResultStore, StoreError};

/// Accepts jobs, hands them to the broker and answers status polls.
///
/// The gateway only ever creates jobs; all later writes belong to workers.
pub struct JobGateway {
    store: Arc<dyn ResultStore>,
    broker: Arc<dyn Broker>,
    registry: Arc<ProviderRegistry>,
    settings: Arc<Settings>,
}

impl JobGateway {
    pub fn new(
        store: Arc<dyn ResultStore>,
        broker: Arc<dyn Broker>,
        registry: Arc<ProviderRegistry>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            store,
            broker,
            registry,
            settings,
        }
    }

    /// Validate, persist as QUEUED and enqueue. Returns without waiting for
    /// execution.
    ///
    /// An explicit `job_id` makes the call idempotent: re-submitting an id
    /// returns the existing job and enqueues nothing.
    pub async fn submit(
        &self,
        request: ContentRequest,
        provider: Option<&str>,
        job_id: Option<Uuid>,
    ) -> Result<Job, JobError> {
        request.validate()?;

        let provider_name = provider
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.settings.default_provider.as_str())
            .to_lowercase();

        // Surface unknown providers and unusable config now rather than as a
        // failed job later.
        let strategy = self.registry.get(
            &provider_name,
            self.settings.mock_mode,
            &self.settings,
            &ProviderOverrides::default(),
        )?;

        let id = job_id.unwrap_or_else(Uuid::new_v4);
        if let Some(existing) = self.store.get(id).await? {
            tracing::info!(job_id = %id, "Job already submitted, returning existing snapshot");
            return Ok(existing);
        }

        let job = Job::new(id, request.clone(), strategy.name());
        if !self.store.create(&job).await? {
            // lost a race with an identical submission
            return self.get_status(id).await;
        }

        let message = QueuedJob {
            job_id: id,
            request,
            provider_name: provider_name.clone(),
        };
        let enqueued = match self.broker.enqueue(&message).await {
            Ok(true) => Ok(()),
            // The store had no record, so the broker's claim on this id is
            // stale; nothing will ever execute the job.
            Ok(false) => Err(JobError::AlreadyEnqueued(id)),
            Err(e) => Err(JobError::Queue(e)),
        };
        if let Err(e) = enqueued {
            tracing::error!(job_id = %id, error = %e, "Failed to enqueue job, rolling back");
            if let Err(cleanup) = self.store.delete(id).await {
                tracing::error!(job_id = %id, error = %cleanup, "Failed to roll back job record");
            }
            return Err(e);
        }

        metrics::counter!("content_jobs_submitted_total", "provider" => job.provider_name.clone())
            .increment(1);
        tracing::info!(
            job_id = %id,
            provider = %job.provider_name,
            requested_provider = %provider_name,
            "Job queued"
        );

        Ok(job)
    }

    /// Current snapshot of a job. Read-only.
    pub async fn get_status(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.store
            .get(job_id)
            .await?
            .ok_or(JobError::NotFound(job_id))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Invalid request: {0}")]
    Validation(#[from] garde::Report),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Job {0} was already accepted by the broker but has no record")]
    AlreadyEnqueued(Uuid),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
