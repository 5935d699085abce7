//! Collaborator traits consumed by the scheduler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sfumato_core::{BrandAsset, GenerationOutput, GenerationRequest, ProjectContext};
use sfumato_error::{GeminiError, SfumatoResult};

/// Outcome of probing an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValidation {
    /// Whether the key was accepted
    pub valid: bool,
    /// Human-readable detail
    pub message: String,
}

/// Remote service that turns a request into images.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate images for `request`, retrying transient failures.
    ///
    /// Fails when retries are exhausted, on a fatal status, or when the
    /// response carries no image.
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> Result<GenerationOutput, GeminiError>;

    /// Cheap read-only probe of `api_key`. Never fails.
    async fn validate_api_key(&self, api_key: &str) -> KeyValidation;

    /// Provider name (e.g. "gemini").
    fn provider_name(&self) -> &'static str;
}

/// Spend ceilings in USD. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpendLimits {
    /// Ceiling for the current calendar month
    pub monthly: Option<f64>,
    /// Ceiling across all recorded usage
    pub total: Option<f64>,
}

/// Live settings the scheduler reads at decision time.
pub trait ConfigProvider: Send + Sync {
    /// Current API key, if any.
    fn api_key(&self) -> Option<String>;

    /// Configured dispatch concurrency, before clamping.
    fn concurrency(&self) -> usize;

    /// Configured spend ceilings.
    fn spend_limits(&self) -> SpendLimits;
}

/// Read-only access to project settings and brand assets.
#[async_trait]
pub trait ProjectLookup: Send + Sync {
    /// Project settings by id, or `None` if it does not exist.
    async fn project(&self, project_id: &str) -> SfumatoResult<Option<ProjectContext>>;

    /// Brand assets of a project, in display order.
    async fn brand_assets(&self, project_id: &str) -> SfumatoResult<Vec<BrandAsset>>;
}
