//! Error types for the Sfumato generation queue.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use sfumato_error::{SfumatoResult, ConfigError};
//!
//! fn load() -> SfumatoResult<String> {
//!     Err(ConfigError::new("missing api key"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
#[cfg(feature = "database")]
mod database;
mod error;
mod gemini;
mod json;
mod queue;
mod storage;
mod validation;

pub use config::ConfigError;
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{SfumatoError, SfumatoErrorKind, SfumatoResult};
pub use gemini::{GeminiError, GeminiErrorKind, RetryableError};
pub use json::JsonError;
pub use queue::{QueueError, QueueErrorKind, SpendLimitKind};
pub use storage::{StorageError, StorageErrorKind};
pub use validation::ValidationError;
