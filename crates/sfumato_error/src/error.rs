//! Top-level error wrapper types.

#[cfg(feature = "database")]
use crate::DatabaseError;
use crate::{ConfigError, GeminiError, JsonError, QueueError, StorageError, ValidationError};

/// Union of every error the workspace produces.
///
/// # Examples
///
/// ```
/// use sfumato_error::{SfumatoError, ConfigError};
///
/// let err: SfumatoError = ConfigError::new("bad toml").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum SfumatoErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Request validation error
    #[from(ValidationError)]
    Validation(ValidationError),
    /// Artifact storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Remote generation error
    #[from(GeminiError)]
    Gemini(GeminiError),
    /// Durable store error
    #[cfg(feature = "database")]
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Scheduler error
    #[from(QueueError)]
    Queue(QueueError),
}

/// Sfumato error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Sfumato Error: {}", _0)]
pub struct SfumatoError(Box<SfumatoErrorKind>);

impl SfumatoError {
    /// Create a new error from a kind.
    pub fn new(kind: SfumatoErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &SfumatoErrorKind {
        &self.0
    }

    /// Message for end users, without source locations.
    ///
    /// # Examples
    ///
    /// ```
    /// use sfumato_error::{SfumatoError, ValidationError};
    ///
    /// let err: SfumatoError = ValidationError::new("prompt", "must not be empty").into();
    /// assert_eq!(err.user_message(), "prompt: must not be empty");
    /// ```
    pub fn user_message(&self) -> String {
        match self.kind() {
            SfumatoErrorKind::Config(e) => e.message.clone(),
            SfumatoErrorKind::Json(e) => e.message.clone(),
            SfumatoErrorKind::Validation(e) => format!("{}: {}", e.field, e.message),
            SfumatoErrorKind::Storage(e) => e.kind.to_string(),
            SfumatoErrorKind::Gemini(e) => e.kind.to_string(),
            #[cfg(feature = "database")]
            SfumatoErrorKind::Database(e) => e.kind.to_string(),
            SfumatoErrorKind::Queue(e) => e.kind.to_string(),
        }
    }
}

// Generic From implementation for any type that converts to SfumatoErrorKind
impl<T> From<T> for SfumatoError
where
    T: Into<SfumatoErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Sfumato operations.
pub type SfumatoResult<T> = std::result::Result<T, SfumatoError>;
