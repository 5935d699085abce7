//! Request validation errors.

/// A generation request was rejected at the boundary.
///
/// Carries the offending field so callers can point the user at it.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Validation Error: {}: {} at line {} in {}", field, message, line, file)]
pub struct ValidationError {
    /// Field that failed validation
    pub field: String,
    /// What was wrong with it
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ValidationError {
    /// Create a new ValidationError for `field`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sfumato_error::ValidationError;
    ///
    /// let err = ValidationError::new("prompt", "must not be empty");
    /// assert_eq!(err.field, "prompt");
    /// ```
    #[track_caller]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            field: field.into(),
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
