//! Artifact storage error types.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create storage directory
    #[display("Failed to create storage directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write file
    #[display("Failed to write file: {}", _0)]
    FileWrite(String),
    /// Failed to read file
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
    /// Failed to remove file
    #[display("Failed to remove file: {}", _0)]
    FileRemove(String),
    /// Transport-encoded payload was empty or malformed
    #[display("Invalid image payload: {}", _0)]
    InvalidPayload(String),
    /// Payload exceeds the raw byte ceiling
    #[display("Payload of {} bytes exceeds the {} byte limit", size, limit)]
    PayloadTooLarge {
        /// Estimated or actual payload size in bytes
        size: u64,
        /// Ceiling in bytes
        limit: u64,
    },
    /// Image bytes could not be decoded
    #[display("Failed to decode image: {}", _0)]
    ImageDecode(String),
    /// Thumbnail could not be derived or encoded
    #[display("Failed to create thumbnail: {}", _0)]
    Thumbnail(String),
    /// Metadata row could not be written
    #[display("Failed to record artifact: {}", _0)]
    Metadata(String),
    /// Background task failed to complete
    #[display("Storage task failed: {}", _0)]
    Task(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use sfumato_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::InvalidPayload("empty".to_string()));
/// assert!(format!("{}", err).contains("Invalid image payload"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
