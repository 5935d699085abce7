//! Queue job state machine.

use crate::GenerationRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a queue job.
///
/// Jobs move `pending -> running -> completed | failed`, or
/// `pending -> cancelled`. `running -> pending` happens only during
/// startup recovery and is not a normal transition.
///
/// # Examples
///
/// ```
/// use sfumato_core::JobStatus;
///
/// assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
/// assert!(JobStatus::Pending.can_transition_to(JobStatus::Cancelled));
/// assert!(!JobStatus::Running.can_transition_to(JobStatus::Cancelled));
/// assert!(!JobStatus::Failed.can_transition_to(JobStatus::Running));
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a dispatch slot
    Pending,
    /// Dispatched and executing
    Running,
    /// Finished with a persisted image
    Completed,
    /// Finished with an error
    Failed,
    /// Withdrawn before it started
    Cancelled,
}

impl JobStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether the job still holds a spend reservation.
    pub fn is_open(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// Whether `next` is a legal forward transition from `self`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Cancelled)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

/// One unit of scheduled generation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(rename_all = "camelCase")]
pub struct QueueJob {
    /// Opaque unique identifier
    id: String,
    /// Current status
    status: JobStatus,
    /// Request with batch count normalized to one
    request: GenerationRequest,
    /// Image produced on completion
    result_id: Option<String>,
    /// Failure message
    error: Option<String>,
    /// Higher values dispatch first
    priority: i32,
    /// When the job was enqueued
    created_at: DateTime<Utc>,
    /// When the job was dispatched
    started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state
    completed_at: Option<DateTime<Utc>>,
}

impl QueueJob {
    /// Creates a pending job for a single-unit request.
    pub fn pending(
        id: impl Into<String>,
        request: GenerationRequest,
        priority: i32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            request: request.single_unit(),
            result_id: None,
            error: None,
            priority,
            created_at,
            started_at: None,
            completed_at: None,
        }
    }

    /// Reassembles a job from stored columns.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: String,
        status: JobStatus,
        request: GenerationRequest,
        result_id: Option<String>,
        error: Option<String>,
        priority: i32,
        created_at: DateTime<Utc>,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            status,
            request,
            result_id,
            error,
            priority,
            created_at,
            started_at,
            completed_at,
        }
    }

    /// Cost this job reserves while it is open.
    pub fn reserved_cost(&self) -> f64 {
        self.request.unit_cost()
    }
}
