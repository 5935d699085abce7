//! SQLite durable store for the Sfumato generation queue.
//!
//! Persists queue jobs, generated images and their references, the usage
//! log, and the project rows the scheduler reads for prompt composition.
//!
//! # Features
//!
//! - Diesel-based SQLite with an r2d2 pool and embedded migrations
//! - Conditional single-statement status transitions for jobs
//! - Crash recovery of jobs left `running`
//! - FTS5 search with a substring fallback
//!
//! # Example
//!
//! ```rust,ignore
//! use sfumato_database::SqliteStore;
//!
//! let store = SqliteStore::open("/tmp/sfumato.db")?;
//! let requeued = store.requeue_running_jobs().await?;
//! ```

#![forbid(unsafe_code)]

mod connection;
mod images;
mod jobs;
mod models;
mod projects;
mod search;
mod store;
mod usage;

// Public modules for external access
pub mod schema;

pub use connection::{DbConn, DbPool, establish_pool};
pub use models::{
    BrandAssetRow, ImageRow, NewImageRow, NewProjectRow, NewQueueJobRow, NewUsageLogRow,
    ProjectRow, QueueJobRow, ReferenceImageRow,
};
pub use store::SqliteStore;

use sfumato_error::DatabaseError;

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
