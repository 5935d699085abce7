//! Enumerated option domains for generation requests.
//!
//! Every field of a request that the remote service constrains to a fixed
//! set is modelled as an enum, so invalid values are rejected when the
//! request is deserialized rather than deep inside the scheduler.

use serde::{Deserialize, Serialize};

/// Pricing and capability tier of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ModelTier {
    /// High-fidelity tier supporting every resolution
    Pro,
    /// Low-latency tier with a single output size
    Fast,
}

/// Image-capable models accepted by the queue.
///
/// # Examples
///
/// ```
/// use sfumato_core::{ImageModel, ModelTier};
/// use std::str::FromStr;
///
/// let model = ImageModel::from_str("gemini-2.5-flash-image").unwrap();
/// assert_eq!(model.tier(), ModelTier::Fast);
/// assert_eq!(model.as_ref(), "gemini-2.5-flash-image");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum ImageModel {
    /// Gemini 3 Pro Image (preview channel)
    #[default]
    #[serde(rename = "gemini-3-pro-image-preview")]
    #[strum(serialize = "gemini-3-pro-image-preview")]
    Gemini3ProImagePreview,
    /// Gemini 3 Pro Image
    #[serde(rename = "gemini-3-pro-image")]
    #[strum(serialize = "gemini-3-pro-image")]
    Gemini3ProImage,
    /// Gemini 2.5 Flash Image
    #[serde(rename = "gemini-2.5-flash-image")]
    #[strum(serialize = "gemini-2.5-flash-image")]
    Gemini25FlashImage,
    /// Gemini 2.5 Flash Image (preview channel)
    #[serde(rename = "gemini-2.5-flash-image-preview")]
    #[strum(serialize = "gemini-2.5-flash-image-preview")]
    Gemini25FlashImagePreview,
}

impl ImageModel {
    /// Tier the model is billed and clamped under.
    pub fn tier(&self) -> ModelTier {
        match self {
            ImageModel::Gemini3ProImagePreview | ImageModel::Gemini3ProImage => ModelTier::Pro,
            ImageModel::Gemini25FlashImage | ImageModel::Gemini25FlashImagePreview => {
                ModelTier::Fast
            }
        }
    }

    /// Whether the model accepts an explicit output size.
    pub fn supports_image_size(&self) -> bool {
        self.tier() == ModelTier::Pro
    }
}

/// Output resolution tier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum Resolution {
    /// 512 pixels on the long edge
    #[serde(rename = "512px")]
    #[strum(serialize = "512px")]
    Px512,
    /// Roughly one megapixel
    #[default]
    #[serde(rename = "1K")]
    #[strum(serialize = "1K")]
    OneK,
    /// Roughly four megapixels
    #[serde(rename = "2K")]
    #[strum(serialize = "2K")]
    TwoK,
    /// Roughly sixteen megapixels
    #[serde(rename = "4K")]
    #[strum(serialize = "4K")]
    FourK,
}

/// Output aspect ratio.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum AspectRatio {
    /// 1:1
    #[default]
    #[serde(rename = "1:1")]
    #[strum(serialize = "1:1")]
    Square,
    /// 2:3
    #[serde(rename = "2:3")]
    #[strum(serialize = "2:3")]
    Portrait2x3,
    /// 3:2
    #[serde(rename = "3:2")]
    #[strum(serialize = "3:2")]
    Landscape3x2,
    /// 3:4
    #[serde(rename = "3:4")]
    #[strum(serialize = "3:4")]
    Portrait3x4,
    /// 4:3
    #[serde(rename = "4:3")]
    #[strum(serialize = "4:3")]
    Landscape4x3,
    /// 4:5
    #[serde(rename = "4:5")]
    #[strum(serialize = "4:5")]
    Portrait4x5,
    /// 5:4
    #[serde(rename = "5:4")]
    #[strum(serialize = "5:4")]
    Landscape5x4,
    /// 9:16
    #[serde(rename = "9:16")]
    #[strum(serialize = "9:16")]
    Portrait9x16,
    /// 16:9
    #[serde(rename = "16:9")]
    #[strum(serialize = "16:9")]
    Landscape16x9,
    /// 21:9
    #[serde(rename = "21:9")]
    #[strum(serialize = "21:9")]
    Ultrawide21x9,
    /// 9:21
    #[serde(rename = "9:21")]
    #[strum(serialize = "9:21")]
    Tall9x21,
    /// 1:4
    #[serde(rename = "1:4")]
    #[strum(serialize = "1:4")]
    Strip1x4,
    /// 4:1
    #[serde(rename = "4:1")]
    #[strum(serialize = "4:1")]
    Banner4x1,
}

/// Reasoning budget hint passed to the model.
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
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThinkingLevel {
    /// Minimal reasoning
    Low,
    /// Extended reasoning
    High,
}

/// Part types the model may return.
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
    strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ResponseModality {
    /// Accompanying text
    Text,
    /// Image parts
    Image,
}

/// Role a reference image plays in the generation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReferenceLabel {
    /// Identity to preserve
    Person,
    /// Subject or product to include
    #[default]
    Object,
    /// Visual style to follow
    Style,
}
