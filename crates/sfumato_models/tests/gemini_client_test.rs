//! HTTP-level tests for the Gemini image client against a mock server.

use serde_json::json;
use sfumato_core::{GenerationRequest, ImageModel};
use sfumato_error::GeminiErrorKind;
use sfumato_interface::ImageGenerator;
use sfumato_models::{GeminiClientConfig, GeminiImageClient, RetryPolicy};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";
const BASE_DELAY: Duration = Duration::from_millis(40);

fn client(server: &MockServer) -> anyhow::Result<GeminiImageClient> {
    let config = GeminiClientConfig::builder()
        .base_url(server.uri())
        .retry(RetryPolicy::new(3, BASE_DELAY))
        .build()?;
    Ok(GeminiImageClient::new(config)?)
}

fn request() -> GenerationRequest {
    GenerationRequest::new(ImageModel::Gemini25FlashImage, "a paper crane")
}

fn image_body() -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"parts": [
                {"text": "A crane, folded."},
                {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
            ]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 1290, "totalTokenCount": 1297}
    })
}

/// Answers 503 until `failures` requests have arrived, then succeeds, and
/// records when each request came in.
struct Flaky {
    failures: usize,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for Flaky {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut arrivals = self.arrivals.lock().unwrap();
        arrivals.push(Instant::now());
        if arrivals.len() <= self.failures {
            ResponseTemplate::new(503).set_body_json(json!({
                "error": {"code": 503, "message": "The model is overloaded", "status": "UNAVAILABLE"}
            }))
        } else {
            ResponseTemplate::new(200).set_body_json(image_body())
        }
    }
}

#[tokio::test]
async fn transient_failures_are_retried_with_backoff() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(Flaky {
            failures: 2,
            arrivals: Arc::clone(&arrivals),
        })
        .expect(3)
        .mount(&server)
        .await;

    let output = client(&server)?.generate(&request(), "test-key").await?;

    assert_eq!(output.attempts, 3);
    assert_eq!(output.images.len(), 1);
    assert_eq!(output.images[0].mime_type, "image/png");
    assert_eq!(output.model_text.as_deref(), Some("A crane, folded."));

    let arrivals = arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 3);
    let first_gap = arrivals[1] - arrivals[0];
    let second_gap = arrivals[2] - arrivals[1];
    assert!(first_gap >= BASE_DELAY, "first gap {:?}", first_gap);
    assert!(second_gap >= BASE_DELAY * 2, "second gap {:?}", second_gap);
    Ok(())
}

#[tokio::test]
async fn rate_limited_response_is_retried() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body()))
        .mount(&server)
        .await;

    let output = client(&server)?.generate(&request(), "test-key").await?;
    assert_eq!(output.attempts, 2);
    Ok(())
}

#[tokio::test]
async fn client_error_is_not_retried() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "Invalid aspect ratio", "status": "INVALID_ARGUMENT"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)?
        .generate(&request(), "test-key")
        .await
        .unwrap_err();

    match err.kind {
        GeminiErrorKind::HttpError {
            status_code,
            ref message,
        } => {
            assert_eq!(status_code, 400);
            assert_eq!(message, "Invalid aspect ratio");
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn exhausted_retries_surface_last_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server)?
        .generate(&request(), "test-key")
        .await
        .unwrap_err();
    assert_eq!(err.kind.effective_status(), Some(500));
    Ok(())
}

#[tokio::test]
async fn imageless_response_is_fatal() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "I can only describe it."}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)?
        .generate(&request(), "test-key")
        .await
        .unwrap_err();
    assert!(matches!(err.kind, GeminiErrorKind::NoImage(_)));
    Ok(())
}

#[tokio::test]
async fn slow_response_times_out_as_retryable() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(image_body())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = GeminiClientConfig::builder()
        .base_url(server.uri())
        .generation_timeout(Duration::from_millis(50))
        .retry(RetryPolicy::new(2, Duration::from_millis(10)))
        .build()?;
    let err = GeminiImageClient::new(config)?
        .generate(&request(), "test-key")
        .await
        .unwrap_err();

    assert_eq!(err.kind, GeminiErrorKind::Timeout(50));
    assert!(err.kind.is_retryable());
    Ok(())
}

#[tokio::test]
async fn missing_key_fails_without_a_request() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let err = client(&server)?
        .generate(&request(), "  ")
        .await
        .unwrap_err();
    assert_eq!(err.kind, GeminiErrorKind::MissingApiKey);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}

#[tokio::test]
async fn request_body_matches_wire_shape() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-3-pro-image-preview:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body()))
        .mount(&server)
        .await;

    let mut request = GenerationRequest::new(ImageModel::Gemini3ProImagePreview, "a lighthouse");
    request.system_prompt = Some("Brand guidelines:\nuse teal".to_string());
    client(&server)?.generate(&request, "test-key").await?;

    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&received[0].body)?;
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "a lighthouse");
    assert_eq!(
        body["systemInstruction"]["parts"][0]["text"],
        "Brand guidelines:\nuse teal"
    );
    assert_eq!(body["generationConfig"]["imageConfig"]["imageSize"], "1K");
    Ok(())
}

#[tokio::test]
async fn key_validation_reports_outcome() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(query_param("pageSize", "1"))
        .and(header("x-goog-api-key", "good-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid. Please pass a valid API key."}
        })))
        .mount(&server)
        .await;

    let client = client(&server)?;
    let good = client.validate_api_key("good-key").await;
    assert!(good.valid);

    let bad = client.validate_api_key("bad-key").await;
    assert!(!bad.valid);
    assert!(bad.message.contains("API key not valid"));

    let empty = client.validate_api_key("").await;
    assert!(!empty.valid);
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);
    Ok(())
}
