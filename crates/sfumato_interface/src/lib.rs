//! Trait definitions at the seams of the Sfumato generation queue.
//!
//! The scheduler depends only on these traits, so the remote client,
//! configuration source, and project store can each be swapped for test
//! doubles.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;

pub use traits::{ConfigProvider, ImageGenerator, KeyValidation, ProjectLookup, SpendLimits};
