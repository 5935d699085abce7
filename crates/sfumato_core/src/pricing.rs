//! Per-image cost estimates.

use crate::{ImageModel, ModelTier, Resolution};

const PRO_STANDARD_COST: f64 = 0.134;
const PRO_4K_COST: f64 = 0.24;
const FAST_COST: f64 = 0.039;

/// Resolution the model will actually render at.
///
/// The fast tier supports a single size, so any request is clamped to it.
///
/// ```
/// use sfumato_core::{effective_resolution, ImageModel, Resolution};
///
/// assert_eq!(
///     effective_resolution(ImageModel::Gemini25FlashImage, Some(Resolution::FourK)),
///     Resolution::OneK
/// );
/// assert_eq!(
///     effective_resolution(ImageModel::Gemini3ProImage, Some(Resolution::FourK)),
///     Resolution::FourK
/// );
/// ```
pub fn effective_resolution(model: ImageModel, requested: Option<Resolution>) -> Resolution {
    match model.tier() {
        ModelTier::Pro => requested.unwrap_or_default(),
        ModelTier::Fast => Resolution::OneK,
    }
}

/// Estimated USD cost of one image.
pub fn estimate_cost(model: ImageModel, requested: Option<Resolution>) -> f64 {
    match (model.tier(), effective_resolution(model, requested)) {
        (ModelTier::Fast, _) => FAST_COST,
        (ModelTier::Pro, Resolution::FourK) => PRO_4K_COST,
        (ModelTier::Pro, _) => PRO_STANDARD_COST,
    }
}
