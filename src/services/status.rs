//! Execution-substrate states and their projection onto domain job states.
//!
//! Workers report what happened in the queue's own vocabulary; pollers only
//! ever see the four [`JobStatus`] values. The mapping below is exhaustive so
//! adding a substrate state is a compile error until it is mapped.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::models::job::JobStatus;

/// State as reported by the execution substrate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ExecutionState {
    /// Message accepted, no worker has seen it yet.
    Pending,
    /// Delivered to a worker that has not started executing it.
    Received,
    Started,
    /// Execution failed and another attempt is scheduled.
    Retry,
    Success,
    Failure,
    /// Withdrawn before or during execution.
    Revoked,
}

/// Collapse a substrate state into the nearest domain state.
pub fn map_state(state: ExecutionState) -> JobStatus {
    match state {
        ExecutionState::Pending | ExecutionState::Received => JobStatus::Queued,
        ExecutionState::Started | ExecutionState::Retry => JobStatus::Processing,
        ExecutionState::Success => JobStatus::Completed,
        ExecutionState::Failure | ExecutionState::Revoked => JobStatus::Failed,
    }
}
