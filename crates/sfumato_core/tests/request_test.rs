use sfumato_core::{
    AspectRatio, GenerationRequest, ImageModel, ReferenceImageInput, ReferenceLabel, Resolution,
    ResponseModality,
};

fn reference(mime: &str) -> ReferenceImageInput {
    ReferenceImageInput {
        mime_type: mime.to_string(),
        data_base64: "aGVsbG8=".to_string(),
        label: Some(ReferenceLabel::Style),
    }
}

#[test]
fn deserializes_camel_case_wire_shape() {
    let json = r#"{
        "model": "gemini-3-pro-image",
        "prompt": "a red fox in snow",
        "systemPrompt": "photorealistic",
        "referenceImages": [{"mimeType": "image/png", "dataBase64": "aGVsbG8=", "label": "person"}],
        "aspectRatio": "16:9",
        "resolution": "4K",
        "thinkingLevel": "high",
        "useGoogleSearch": true,
        "responseModalities": ["TEXT", "IMAGE"],
        "batchCount": 2,
        "parentId": "img-1",
        "projectId": "proj-1"
    }"#;

    let request: GenerationRequest = serde_json::from_str(json).unwrap();
    assert_eq!(request.model, ImageModel::Gemini3ProImage);
    assert_eq!(request.aspect_ratio, Some(AspectRatio::Landscape16x9));
    assert_eq!(request.resolution, Some(Resolution::FourK));
    assert_eq!(request.references()[0].label, Some(ReferenceLabel::Person));
    assert!(request.uses_search());
    assert!(request.validate().is_ok());
}

#[test]
fn rejects_values_outside_option_domains() {
    let bad_ratio = r#"{"model":"gemini-3-pro-image","prompt":"x","aspectRatio":"7:3"}"#;
    assert!(serde_json::from_str::<GenerationRequest>(bad_ratio).is_err());

    let bad_model = r#"{"model":"dall-e-3","prompt":"x"}"#;
    assert!(serde_json::from_str::<GenerationRequest>(bad_model).is_err());

    let unknown_field = r#"{"model":"gemini-3-pro-image","prompt":"x","seed":4}"#;
    assert!(serde_json::from_str::<GenerationRequest>(unknown_field).is_err());
}

#[test]
fn validate_rejects_empty_prompt() {
    let request = GenerationRequest::new(ImageModel::Gemini3ProImage, "   ");
    let err = request.validate().unwrap_err();
    assert_eq!(err.field, "prompt");
}

#[test]
fn validate_rejects_too_many_references() {
    let mut request = GenerationRequest::new(ImageModel::Gemini3ProImage, "collage");
    request.reference_images = Some((0..15).map(|_| reference("image/png")).collect());
    let err = request.validate().unwrap_err();
    assert_eq!(err.field, "referenceImages");
}

#[test]
fn validate_rejects_unsupported_reference_type() {
    let mut request = GenerationRequest::new(ImageModel::Gemini3ProImage, "collage");
    request.reference_images = Some(vec![reference("image/png"), reference("application/pdf")]);
    let err = request.validate().unwrap_err();
    assert_eq!(err.field, "referenceImages[1].mimeType");
}

#[test]
fn validate_requires_image_modality() {
    let mut request = GenerationRequest::new(ImageModel::Gemini3ProImage, "caption only");
    request.response_modalities = Some(vec![ResponseModality::Text]);
    assert!(request.validate().is_err());
}

#[test]
fn batch_count_is_normalized() {
    let mut request = GenerationRequest::new(ImageModel::Gemini3ProImage, "sky");
    assert_eq!(request.normalized_batch_count(), 1);

    request.batch_count = Some(0);
    assert_eq!(request.normalized_batch_count(), 1);

    request.batch_count = Some(12);
    assert_eq!(request.normalized_batch_count(), 4);
    assert_eq!(request.single_unit().batch_count, Some(1));
}

#[test]
fn batch_cost_scales_with_normalized_count() {
    let mut request = GenerationRequest::new(ImageModel::Gemini3ProImage, "sky");
    request.resolution = Some(Resolution::FourK);
    request.batch_count = Some(3);
    assert!((request.batch_cost() - 0.72).abs() < 1e-9);
}
