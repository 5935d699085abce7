//! Core data types for the Sfumato generation queue.
//!
//! Requests, option domains, pricing, the job state machine, and the
//! records that flow between the durable store, the remote client and the
//! scheduler all live here so that every crate agrees on one vocabulary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod event;
mod image;
mod job;
mod limits;
mod options;
mod output;
mod pricing;
mod project;
mod request;

pub use event::QueueEvent;
pub use image::{
    CostWindow, GeneratedImage, ImageQuery, ImageQueryBuilder, NewGeneratedImage, ReferenceImage,
    UsageLogEntry,
};
pub use job::{JobStatus, QueueJob};
pub use limits::{
    DEFAULT_CONCURRENCY, MAX_ASSET_BYTES, MAX_BATCH_COUNT, MAX_CONCURRENCY, MAX_REFERENCE_IMAGES,
    MIN_CONCURRENCY, clamp_batch_count, clamp_concurrency,
};
pub use options::{
    AspectRatio, ImageModel, ModelTier, ReferenceLabel, Resolution, ResponseModality,
    ThinkingLevel,
};
pub use output::{GenerationOutput, ImagePayload, TokenUsage};
pub use pricing::{effective_resolution, estimate_cost};
pub use project::{BrandAsset, ProjectContext};
pub use request::{GenerationRequest, ReferenceImageInput};
