//! Scheduler error types.

/// Which spend ceiling an admission check ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum SpendLimitKind {
    /// Calendar month in UTC
    #[display("monthly")]
    Monthly,
    /// All recorded usage
    #[display("total")]
    Total,
}

/// Scheduler error conditions.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum QueueErrorKind {
    /// Admission control rejected the work
    #[display(
        "{} spend limit of ${:.4} would be exceeded: spent ${:.4}, reserved ${:.4}, attempted ${:.4} (short by ${:.4})",
        limit,
        ceiling,
        spent,
        reserved,
        attempted,
        shortfall
    )]
    SpendLimitExceeded {
        /// Ceiling that was hit
        limit: SpendLimitKind,
        /// Configured ceiling in USD
        ceiling: f64,
        /// Confirmed spend inside the window
        spent: f64,
        /// Cost reserved by other open jobs
        reserved: f64,
        /// Cost of the work being admitted
        attempted: f64,
        /// Amount by which the ceiling would be overrun
        shortfall: f64,
    },
    /// No job with this id
    #[display("Job not found: {}", _0)]
    JobNotFound(String),
    /// Request failed boundary validation
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),
    /// Operation not valid for the job's current status
    #[display("Job {} is {}; {}", job_id, status, message)]
    InvalidTransition {
        /// Job the operation targeted
        job_id: String,
        /// Current status of the job
        status: String,
        /// What was attempted
        message: String,
    },
    /// The dispatcher is no longer running
    #[display("Queue has shut down")]
    ShutDown,
    /// Another dispatcher holds the lease for this store
    #[display("Another process is already running jobs from {}", _0)]
    DispatcherBusy(String),
    /// The dispatch lease file could not be opened or locked
    #[display("Dispatch lease error: {}", _0)]
    Lease(String),
}

/// Scheduler error with source location tracking.
///
/// # Examples
///
/// ```
/// use sfumato_error::{QueueError, QueueErrorKind};
///
/// let err = QueueError::new(QueueErrorKind::JobNotFound("abc".to_string()));
/// assert!(format!("{}", err).contains("abc"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Queue Error: {} at line {} in {}", kind, line, file)]
pub struct QueueError {
    /// The kind of error that occurred
    pub kind: QueueErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl QueueError {
    /// Create a new QueueError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: QueueErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
