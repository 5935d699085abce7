//! REST client for image generation over `generateContent`.

use super::payload::{build_payload, parse_output};
use super::protocol::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};
use crate::RetryPolicy;
use async_trait::async_trait;
use derive_builder::Builder;
use derive_getters::Getters;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use sfumato_core::{GenerationOutput, GenerationRequest};
use sfumato_error::{GeminiError, GeminiErrorKind};
use sfumato_interface::{ImageGenerator, KeyValidation};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, info, instrument, warn};

/// Production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Connection settings for [`GeminiImageClient`].
///
/// # Examples
///
/// ```
/// use sfumato_models::{GeminiClientConfig, RetryPolicy};
/// use std::time::Duration;
///
/// let config = GeminiClientConfig::builder()
///     .base_url("http://localhost:8080")
///     .retry(RetryPolicy::new(5, Duration::from_millis(250)))
///     .requests_per_minute(30u32)
///     .build()
///     .unwrap();
///
/// assert_eq!(*config.retry().max_attempts(), 5);
/// assert_eq!(*config.generation_timeout(), Duration::from_secs(180));
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Getters)]
#[builder(setter(into), default)]
pub struct GeminiClientConfig {
    /// Scheme and host, without the `/v1beta` path
    base_url: String,
    /// Deadline for one generation attempt
    generation_timeout: Duration,
    /// Deadline for a key probe
    validation_timeout: Duration,
    /// Backoff for transient failures
    retry: RetryPolicy,
    /// Client-side request ceiling; `None` disables local throttling
    #[builder(setter(strip_option))]
    requests_per_minute: Option<u32>,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            generation_timeout: Duration::from_secs(180),
            validation_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            requests_per_minute: None,
        }
    }
}

impl GeminiClientConfig {
    /// Starts a builder seeded with defaults.
    pub fn builder() -> GeminiClientConfigBuilder {
        GeminiClientConfigBuilder::default()
    }
}

/// Image generation client for the Gemini REST API.
///
/// The API key is supplied per call so a key change in configuration takes
/// effect on the next job without rebuilding the client.
#[derive(Clone)]
pub struct GeminiImageClient {
    http: Client,
    config: GeminiClientConfig,
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for GeminiImageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiImageClient")
            .field("config", &self.config)
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

impl GeminiImageClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiErrorKind::ClientCreation`] if the HTTP client
    /// cannot be initialized.
    #[instrument(name = "gemini_image_client_new", skip_all)]
    pub fn new(config: GeminiClientConfig) -> Result<Self, GeminiError> {
        let http = Client::builder()
            .build()
            .map_err(|e| GeminiError::new(GeminiErrorKind::ClientCreation(e.to_string())))?;

        let limiter = config
            .requests_per_minute
            .and_then(NonZeroU32::new)
            .map(|rpm| Arc::new(RateLimiter::direct(Quota::per_minute(rpm))));

        debug!(
            base_url = %config.base_url,
            max_attempts = *config.retry.max_attempts(),
            rate_limited = limiter.is_some(),
            "Created Gemini image client"
        );

        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    /// Client settings.
    pub fn config(&self) -> &GeminiClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1beta/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// One HTTP round trip, classified into a [`GeminiError`] on failure.
    async fn send_once(
        &self,
        url: &str,
        payload: &GenerateContentRequest,
        api_key: &str,
    ) -> Result<GenerateContentResponse, GeminiError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let timeout = self.config.generation_timeout;
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::new(GeminiErrorKind::HttpError {
                status_code: status.as_u16(),
                message: error_message(&body, status),
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&e, timeout))?;
        serde_json::from_str(&body)
            .map_err(|e| GeminiError::new(GeminiErrorKind::InvalidResponse(e.to_string())))
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageClient {
    #[instrument(skip(self, request, api_key), fields(model = %request.model))]
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> Result<GenerationOutput, GeminiError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(GeminiError::new(GeminiErrorKind::MissingApiKey));
        }

        let payload = build_payload(request);
        let url = self.endpoint(&format!("models/{}:generateContent", request.model));
        let attempts = AtomicU32::new(0);

        let response = Retry::spawn(self.config.retry.delays(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let url = url.as_str();
            let payload = &payload;
            async move {
                debug!(attempt, "Sending generation request");
                match self.send_once(url, payload, api_key).await {
                    Ok(response) => Ok(response),
                    Err(e) if e.kind.is_retryable() => {
                        warn!(attempt, error = %e, "Generation attempt failed, will retry");
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) => Err(RetryError::Permanent(e)),
                }
            }
        })
        .await?;

        let attempts = attempts.load(Ordering::SeqCst);
        let output = parse_output(response, attempts)?;
        info!(
            attempts,
            images = output.images.len(),
            "Generation succeeded"
        );
        Ok(output)
    }

    #[instrument(skip_all)]
    async fn validate_api_key(&self, api_key: &str) -> KeyValidation {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return KeyValidation {
                valid: false,
                message: "API key is empty".to_string(),
            };
        }

        let result = self
            .http
            .get(self.endpoint("models?pageSize=1"))
            .header(API_KEY_HEADER, api_key)
            .timeout(self.config.validation_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => KeyValidation {
                valid: true,
                message: "API key is valid".to_string(),
            },
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                KeyValidation {
                    valid: false,
                    message: error_message(&body, status),
                }
            }
            Err(e) => KeyValidation {
                valid: false,
                message: format!("Could not reach the generation service: {}", e),
            },
        }
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

fn transport_error(e: &reqwest::Error, timeout: Duration) -> GeminiError {
    if e.is_timeout() {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        GeminiError::new(GeminiErrorKind::Timeout(millis))
    } else {
        GeminiError::new(GeminiErrorKind::Transport(e.to_string()))
    }
}

/// Service-provided message, falling back to the raw body or status text.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}
