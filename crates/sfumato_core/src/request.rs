//! Generation request payload and boundary validation.

use crate::{
    AspectRatio, ImageModel, MAX_REFERENCE_IMAGES, ReferenceLabel, Resolution,
    ResponseModality, ThinkingLevel, clamp_batch_count, estimate_cost,
};
use serde::{Deserialize, Serialize};
use sfumato_error::ValidationError;

const ACCEPTED_REFERENCE_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// Reference image attached inline to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReferenceImageInput {
    /// MIME type of the decoded bytes
    pub mime_type: String,
    /// Base64 payload, optionally with a `data:` URL prefix
    pub data_base64: String,
    /// How the model should use the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<ReferenceLabel>,
}

/// A request to generate one or more images.
///
/// Deserialization rejects unknown fields and any value outside the
/// enumerated option domains; [`GenerationRequest::validate`] checks the
/// remaining free-form fields.
///
/// # Examples
///
/// ```
/// use sfumato_core::{GenerationRequest, ImageModel, Resolution};
///
/// let request: GenerationRequest = serde_json::from_str(
///     r#"{"model":"gemini-3-pro-image-preview","prompt":"a lighthouse","resolution":"2K","batchCount":3}"#,
/// ).unwrap();
///
/// assert_eq!(request.model, ImageModel::Gemini3ProImagePreview);
/// assert_eq!(request.resolution, Some(Resolution::TwoK));
/// assert_eq!(request.batch_count, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenerationRequest {
    /// Model to generate with
    pub model: ImageModel,
    /// User prompt
    pub prompt: String,
    /// Inline system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Inline reference images, in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_images: Option<Vec<ReferenceImageInput>>,
    /// Output aspect ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    /// Requested output resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    /// Reasoning budget hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<ThinkingLevel>,
    /// Enable search grounding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_google_search: Option<bool>,
    /// Part types to request; defaults to text and image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<ResponseModality>>,
    /// How many independent jobs to create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_count: Option<u32>,
    /// Image this one is derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Owning project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl GenerationRequest {
    /// Creates a single-image request with default options.
    pub fn new(model: ImageModel, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Checks free-form fields that the type system cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::new("prompt", "must not be empty"));
        }
        if let Some(modalities) = &self.response_modalities {
            if modalities.is_empty() {
                return Err(ValidationError::new(
                    "responseModalities",
                    "must request at least one modality",
                ));
            }
            if !modalities.contains(&ResponseModality::Image) {
                return Err(ValidationError::new(
                    "responseModalities",
                    "must include IMAGE",
                ));
            }
        }
        let references = self.reference_images.as_deref().unwrap_or_default();
        if references.len() > MAX_REFERENCE_IMAGES {
            return Err(ValidationError::new(
                "referenceImages",
                format!(
                    "at most {} reference images are allowed, got {}",
                    MAX_REFERENCE_IMAGES,
                    references.len()
                ),
            ));
        }
        for (position, reference) in references.iter().enumerate() {
            if !ACCEPTED_REFERENCE_MIME_TYPES.contains(&reference.mime_type.as_str()) {
                return Err(ValidationError::new(
                    format!("referenceImages[{}].mimeType", position),
                    format!("unsupported type {}", reference.mime_type),
                ));
            }
            if reference.data_base64.trim().is_empty() {
                return Err(ValidationError::new(
                    format!("referenceImages[{}].dataBase64", position),
                    "must not be empty",
                ));
            }
        }
        Ok(())
    }

    /// Batch count normalized into `1..=MAX_BATCH_COUNT`.
    pub fn normalized_batch_count(&self) -> u32 {
        clamp_batch_count(self.batch_count)
    }

    /// Copy of this request describing a single unit of work.
    pub fn single_unit(&self) -> Self {
        Self {
            batch_count: Some(1),
            ..self.clone()
        }
    }

    /// Estimated cost of one image for this request.
    pub fn unit_cost(&self) -> f64 {
        estimate_cost(self.model, self.resolution)
    }

    /// Estimated cost of the whole batch.
    pub fn batch_cost(&self) -> f64 {
        self.unit_cost() * f64::from(self.normalized_batch_count())
    }

    /// Explicit references, in order.
    pub fn references(&self) -> &[ReferenceImageInput] {
        self.reference_images.as_deref().unwrap_or_default()
    }

    /// Whether search grounding was requested.
    pub fn uses_search(&self) -> bool {
        self.use_google_search.unwrap_or(false)
    }
}
