//! Domain events published by the scheduler.

use serde::{Deserialize, Serialize};

/// Notification for UI collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum QueueEvent {
    /// Jobs were added, removed, or changed status
    #[display("queue-changed")]
    QueueChanged,
    /// A job was dispatched
    #[display("job-started {}", job_id)]
    JobStarted {
        /// Dispatched job
        job_id: String,
    },
    /// A job persisted its image
    #[display("job-completed {} -> {}", job_id, image_id)]
    JobCompleted {
        /// Finished job
        job_id: String,
        /// Persisted image
        image_id: String,
    },
    /// A job failed
    #[display("job-failed {}: {}", job_id, message)]
    JobFailed {
        /// Failed job
        job_id: String,
        /// Failure message
        message: String,
    },
}
