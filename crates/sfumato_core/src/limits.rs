//! Fixed bounds shared by the scheduler and the request boundary.

/// Largest number of jobs a single enqueue call may fan out to.
pub const MAX_BATCH_COUNT: u32 = 4;

/// Reference images sent with one generation call, explicit plus brand.
pub const MAX_REFERENCE_IMAGES: usize = 14;

/// Lower bound of the dispatch concurrency setting.
pub const MIN_CONCURRENCY: usize = 1;

/// Upper bound of the dispatch concurrency setting.
pub const MAX_CONCURRENCY: usize = 8;

/// Concurrency used when nothing is configured.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Raw byte ceiling for reference and brand-asset images (20 MB).
pub const MAX_ASSET_BYTES: u64 = 20 * 1024 * 1024;

/// Normalizes a requested batch count into `1..=MAX_BATCH_COUNT`.
///
/// ```
/// use sfumato_core::clamp_batch_count;
///
/// assert_eq!(clamp_batch_count(None), 1);
/// assert_eq!(clamp_batch_count(Some(0)), 1);
/// assert_eq!(clamp_batch_count(Some(9)), 4);
/// ```
pub fn clamp_batch_count(requested: Option<u32>) -> u32 {
    requested.unwrap_or(1).clamp(1, MAX_BATCH_COUNT)
}

/// Clamps a concurrency setting into `MIN_CONCURRENCY..=MAX_CONCURRENCY`.
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}
