//! Remote generation error types and retry classification.

/// Status code a client-side timeout is reported as.
pub const TIMEOUT_STATUS: u16 = 504;

/// Gemini-specific error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GeminiErrorKind {
    /// No API key configured
    #[display("Gemini API key not configured")]
    MissingApiKey,
    /// Failed to build the HTTP client
    #[display("Failed to create Gemini client: {}", _0)]
    ClientCreation(String),
    /// The request did not finish before its deadline
    #[display("Request timed out after {} ms", _0)]
    Timeout(u64),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    HttpError {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Connection could not be established or was dropped
    #[display("Transport error: {}", _0)]
    Transport(String),
    /// Response parsed but carried no image part; holds any accompanying text
    #[display("Model returned no image (text: {:?})", _0)]
    NoImage(String),
    /// Response body was not the expected shape
    #[display("Invalid response: {}", _0)]
    InvalidResponse(String),
    /// Base64 decoding failed
    #[display("Base64 decode error: {}", _0)]
    Base64Decode(String),
}

impl GeminiErrorKind {
    /// Status code used for retry classification.
    ///
    /// Timeouts are folded into the 5xx class.
    pub fn effective_status(&self) -> Option<u16> {
        match self {
            GeminiErrorKind::HttpError { status_code, .. } => Some(*status_code),
            GeminiErrorKind::Timeout(_) => Some(TIMEOUT_STATUS),
            _ => None,
        }
    }

    /// Check if this error type should be retried.
    ///
    /// 429 and every 5xx are transient, as are dropped connections.
    /// Any other 4xx, an imageless response, and malformed payloads are fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            GeminiErrorKind::Transport(_) => true,
            _ => self
                .effective_status()
                .is_some_and(|status| status == 429 || status >= 500),
        }
    }
}

/// Gemini error with source location tracking.
///
/// # Examples
///
/// ```
/// use sfumato_error::{GeminiError, GeminiErrorKind};
///
/// let err = GeminiError::new(GeminiErrorKind::MissingApiKey);
/// assert!(format!("{}", err).contains("API key"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Gemini Error: {} at line {} in {}", kind, line, file)]
pub struct GeminiError {
    /// The kind of error that occurred
    pub kind: GeminiErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GeminiError {
    /// Create a new GeminiError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GeminiErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// # Examples
///
/// ```
/// use sfumato_error::{GeminiError, GeminiErrorKind, RetryableError};
///
/// let overloaded = GeminiError::new(GeminiErrorKind::HttpError {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
/// assert!(overloaded.is_retryable());
///
/// let bad_request = GeminiError::new(GeminiErrorKind::HttpError {
///     status_code: 400,
///     message: "Invalid argument".to_string(),
/// });
/// assert!(!bad_request.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for GeminiError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
