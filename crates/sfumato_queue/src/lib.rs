//! Generation scheduler for Sfumato.
//!
//! [`GenerationQueue`] admits requests against spend ceilings, stores one
//! pending job per batch unit, and dispatches them highest priority first,
//! oldest first, up to a configurable number at a time. Each job resolves
//! its project context, calls the remote generator, persists the first
//! image, and records usage.
//!
//! ```rust,ignore
//! let projects = Arc::new(StoreProjectLookup::new(store.clone()));
//! let queue = GenerationQueue::start(QueueDependencies {
//!     store,
//!     artifacts,
//!     generator: Arc::new(client),
//!     config: Arc::new(config),
//!     projects,
//! })
//! .await?;
//!
//! let ids = queue.enqueue(request).await?;
//! queue.wait_idle().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod admission;
mod context;
mod dispatcher;
mod lease;
mod queue;
mod runner;

pub use admission::{SpendSnapshot, evaluate};
pub use context::{
    BRAND_GUIDELINES_LABEL, ResolvedJob, STRICT_BRAND_INSTRUCTION, compose_system_prompt,
    resolve_job, resolve_references,
};
pub use dispatcher::QueueSnapshot;
pub use queue::{GenerationQueue, QueueDependencies};
