use sfumato_core::{ImageModel, Resolution, effective_resolution, estimate_cost};
use strum::IntoEnumIterator;

#[test]
fn pro_tier_prices_by_resolution() {
    let model = ImageModel::Gemini3ProImagePreview;
    assert_eq!(estimate_cost(model, Some(Resolution::Px512)), 0.134);
    assert_eq!(estimate_cost(model, Some(Resolution::OneK)), 0.134);
    assert_eq!(estimate_cost(model, Some(Resolution::TwoK)), 0.134);
    assert_eq!(estimate_cost(model, Some(Resolution::FourK)), 0.24);
    assert_eq!(estimate_cost(model, None), 0.134);
}

#[test]
fn fast_tier_clamps_every_resolution() {
    for model in [
        ImageModel::Gemini25FlashImage,
        ImageModel::Gemini25FlashImagePreview,
    ] {
        for resolution in Resolution::iter() {
            assert_eq!(effective_resolution(model, Some(resolution)), Resolution::OneK);
            assert_eq!(estimate_cost(model, Some(resolution)), 0.039);
        }
    }
}

#[test]
fn model_ids_round_trip_through_strings() {
    for model in ImageModel::iter() {
        let parsed: ImageModel = model.as_ref().parse().unwrap();
        assert_eq!(parsed, model);
    }
}
