use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::content::{ContentRequest, GeneratedContent};
use crate::services::status::{map_state, ExecutionState};

/// Status of a content generation job as seen by pollers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Statuses only move forward. Staying put is allowed while the job is
    /// live so that finer-grained substrate states can still be recorded.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Queued)
                | (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

/// A content generation job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub execution_state: ExecutionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub request: ContentRequest,
    pub provider_name: String,
    pub model_name_used: Option<String>,
    pub result: Option<GeneratedContent>,
    pub error: Option<String>,
}

/// A state change reported by a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub state: ExecutionState,
    pub result: Option<GeneratedContent>,
    pub model_name: Option<String>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn started() -> Self {
        Self::state(ExecutionState::Started)
    }

    pub fn state(state: ExecutionState) -> Self {
        Self {
            state,
            result: None,
            model_name: None,
            error: None,
        }
    }

    pub fn succeeded(result: GeneratedContent, model_name: String) -> Self {
        Self {
            state: ExecutionState::Success,
            result: Some(result),
            model_name: Some(model_name),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: ExecutionState::Failure,
            result: None,
            model_name: None,
            error: Some(error.into()),
        }
    }
}

impl Job {
    pub fn new(id: Uuid, request: ContentRequest, provider_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            execution_state: ExecutionState::Pending,
            created_at: now,
            updated_at: now,
            request,
            provider_name: provider_name.into(),
            model_name_used: None,
            result: None,
            error: None,
        }
    }

    /// Apply a worker update, enforcing monotonic status and the
    /// result-iff-completed / error-iff-failed invariants.
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), TransitionError> {
        let next = map_state(update.state);
        if !self.status.can_advance_to(next) {
            return Err(TransitionError::Illegal {
                from: self.status,
                to: next,
            });
        }

        match next {
            JobStatus::Completed => {
                let result = update.result.ok_or(TransitionError::MissingResult)?;
                self.result = Some(result);
                self.model_name_used = update.model_name;
            }
            JobStatus::Failed => {
                let error = update
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .ok_or(TransitionError::MissingError)?;
                self.error = Some(error);
                if update.model_name.is_some() {
                    self.model_name_used = update.model_name;
                }
            }
            JobStatus::Queued | JobStatus::Processing => {}
        }

        self.status = next;
        self.execution_state = update.state;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("Illegal job transition from {from} to {to}")]
    Illegal { from: JobStatus, to: JobStatus },

    #[error("Completed jobs must carry a result")]
    MissingResult,

    #[error("Failed jobs must carry a non-empty error")]
    MissingError,
}

/// Response after submitting a job.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Response for querying job status.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GeneratedContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            provider: job.provider_name,
            created_at: job.created_at,
            updated_at: job.updated_at,
            model_name_used: job.model_name_used,
            result: job.result,
            error: job.error,
        }
    }
}
