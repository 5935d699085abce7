//! Generated image, reference, and usage records.

use crate::{AspectRatio, ImageModel, ReferenceLabel, Resolution, ThinkingLevel};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Persisted result of a successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// Image id
    pub id: String,
    /// Owning project
    pub project_id: Option<String>,
    /// Prompt the image was generated from
    pub prompt: String,
    /// Model used
    pub model: ImageModel,
    /// Aspect ratio requested
    pub aspect_ratio: Option<AspectRatio>,
    /// Resolution rendered
    pub resolution: Resolution,
    /// Reasoning level requested
    pub thinking_level: Option<ThinkingLevel>,
    /// Whether search grounding was on
    pub used_search: bool,
    /// Text the model returned with the image
    pub model_text: Option<String>,
    /// Original file
    pub file_path: String,
    /// Derived thumbnail
    pub thumb_path: Option<String>,
    /// Pixel width
    pub width: Option<i32>,
    /// Pixel height
    pub height: Option<i32>,
    /// Size of the original in bytes
    pub file_size: i64,
    /// Image this one was derived from
    pub parent_id: Option<String>,
    /// Wall time of the remote call
    pub generation_ms: i64,
    /// Estimated USD cost
    pub cost_estimate: f64,
    /// Favourite flag
    pub is_favorite: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Values needed to insert a new image row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGeneratedImage {
    /// Image id
    pub id: String,
    /// Owning project
    pub project_id: Option<String>,
    /// Prompt the image was generated from
    pub prompt: String,
    /// Model used
    pub model: ImageModel,
    /// Aspect ratio requested
    pub aspect_ratio: Option<AspectRatio>,
    /// Resolution rendered
    pub resolution: Resolution,
    /// Reasoning level requested
    pub thinking_level: Option<ThinkingLevel>,
    /// Whether search grounding was on
    pub used_search: bool,
    /// Text the model returned with the image
    pub model_text: Option<String>,
    /// Original file
    pub file_path: String,
    /// Derived thumbnail
    pub thumb_path: Option<String>,
    /// Pixel width
    pub width: Option<i32>,
    /// Pixel height
    pub height: Option<i32>,
    /// Size of the original in bytes
    pub file_size: i64,
    /// Image this one was derived from
    pub parent_id: Option<String>,
    /// Wall time of the remote call
    pub generation_ms: i64,
    /// Estimated USD cost
    pub cost_estimate: f64,
}

/// Input image stored alongside a generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    /// Row id
    pub id: String,
    /// Owning generated image
    pub image_id: String,
    /// Stored file
    pub file_path: String,
    /// Role of the reference
    pub label: ReferenceLabel,
    /// Order within the request
    pub position: i32,
}

/// Billable record of a completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLogEntry {
    /// Image the charge belongs to
    pub image_id: Option<String>,
    /// Model billed
    pub model: ImageModel,
    /// Resolution billed
    pub resolution: Resolution,
    /// Estimated USD cost
    pub cost_estimate: f64,
    /// Prompt tokens reported by the service
    pub input_tokens: Option<i64>,
    /// Output tokens reported by the service
    pub output_tokens: Option<i64>,
    /// When the charge was recorded
    pub created_at: DateTime<Utc>,
}

/// Aggregation window for spend queries, in UTC.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CostWindow {
    /// Since midnight today
    Day,
    /// Since the first of this month
    Month,
    /// Everything recorded
    All,
}

impl CostWindow {
    /// Inclusive lower bound of the window relative to `now`.
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use sfumato_core::CostWindow;
    ///
    /// let now = Utc.with_ymd_and_hms(2026, 3, 17, 15, 4, 5).unwrap();
    /// let start = CostWindow::Month.start(now).unwrap();
    /// assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
    /// assert!(CostWindow::All.start(now).is_none());
    /// ```
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            CostWindow::Day => Utc
                .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
                .single(),
            CostWindow::Month => Utc
                .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
                .single(),
            CostWindow::All => None,
        }
    }
}

/// Filters for listing images.
///
/// ```
/// use sfumato_core::ImageQuery;
///
/// let query = ImageQuery::builder().favorites_only(true).limit(20).build().unwrap();
/// assert!(*query.favorites_only());
/// assert_eq!(*query.limit(), 20);
/// ```
#[derive(Debug, Clone, PartialEq, derive_builder::Builder, derive_getters::Getters)]
#[builder(setter(into), default)]
pub struct ImageQuery {
    /// Restrict to one project
    #[builder(setter(strip_option))]
    project_id: Option<String>,
    /// Only favourites
    favorites_only: bool,
    /// Include soft-deleted images
    include_deleted: bool,
    /// Full-text search terms
    #[builder(setter(strip_option))]
    search: Option<String>,
    /// Page size
    limit: i64,
    /// Page offset
    offset: i64,
}

impl Default for ImageQuery {
    fn default() -> Self {
        Self {
            project_id: None,
            favorites_only: false,
            include_deleted: false,
            search: None,
            limit: 100,
            offset: 0,
        }
    }
}

impl ImageQuery {
    /// Creates a new query builder.
    pub fn builder() -> ImageQueryBuilder {
        ImageQueryBuilder::default()
    }
}
