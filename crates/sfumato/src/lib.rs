//! Sfumato - durable AI image generation queue.
//!
//! Sfumato turns image generation requests into durable jobs, admits them
//! against monthly and lifetime spend ceilings, runs them against the
//! Gemini image models with bounded concurrency, and stores the results
//! with thumbnails and searchable metadata.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sfumato::{Engine, SfumatoConfig};
//! use sfumato_core::{GenerationRequest, ImageModel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::open(SfumatoConfig::load()?)?;
//!     let queue = engine.start_queue().await?;
//!
//!     let request = GenerationRequest::new(ImageModel::Gemini25FlashImage, "a fox in fog");
//!     let job_ids = queue.enqueue(request).await?;
//!     queue.wait_idle().await?;
//!
//!     for id in job_ids {
//!         println!("{:?}", queue.get_job(&id).await?);
//!     }
//!     queue.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Sfumato is organized as a workspace with focused crates:
//!
//! - `sfumato_error` - Error types
//! - `sfumato_core` - Requests, jobs, images, pricing
//! - `sfumato_interface` - Collaborator traits
//! - `sfumato_database` - SQLite durable store
//! - `sfumato_models` - Remote generation client
//! - `sfumato_storage` - Image files and thumbnails
//! - `sfumato_queue` - Scheduler
//!
//! This crate adds configuration, logging setup and the `sfumato` binary.
//!
//! # Cargo Features
//!
//! - `otel` - Export spans through OpenTelemetry to stdout

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod observability;

pub use config::{
    API_KEY_ENV, QueueSettings, RemoteSettings, SfumatoConfig, SpendSettings, StorageSettings,
};
pub use engine::Engine;
pub use observability::{
    ObservabilityConfig, init_observability, init_observability_with_config,
    shutdown_observability,
};

pub use sfumato_error::{SfumatoError, SfumatoErrorKind, SfumatoResult};
pub use sfumato_queue::{GenerationQueue, QueueSnapshot};
