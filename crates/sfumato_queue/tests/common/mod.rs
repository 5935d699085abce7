//! Shared fixtures for scheduler tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbImage};
use sfumato_core::{GenerationOutput, GenerationRequest, ImagePayload, TokenUsage};
use sfumato_database::SqliteStore;
use sfumato_error::{GeminiError, GeminiErrorKind};
use sfumato_interface::{ConfigProvider, ImageGenerator, KeyValidation, SpendLimits};
use sfumato_queue::{GenerationQueue, QueueDependencies};
use sfumato_storage::{ArtifactStore, StoreProjectLookup};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Generator with a fixed delay, a call log, and scripted failures.
///
/// Prompts containing "fail" always fail with HTTP 400, and the first
/// `failures` calls fail the same way.
pub struct MockGenerator {
    delay: Duration,
    failures: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new(delay: Duration) -> Self {
        Self::failing_first(delay, 0)
    }

    pub fn failing_first(delay: Duration, failures: usize) -> Self {
        Self {
            delay,
            failures: AtomicUsize::new(failures),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> Result<GenerationOutput, GeminiError> {
        assert_eq!(api_key, "test-key");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted || request.prompt.contains("fail") {
            return Err(GeminiError::new(GeminiErrorKind::HttpError {
                status_code: 400,
                message: "Request contains an invalid argument.".to_string(),
            }));
        }

        Ok(GenerationOutput {
            images: vec![ImagePayload {
                mime_type: "image/png".to_string(),
                data_base64: png_base64(),
            }],
            model_text: Some("Here you go.".to_string()),
            token_usage: Some(TokenUsage {
                input_tokens: Some(12),
                output_tokens: Some(1290),
                total_tokens: Some(1302),
            }),
            attempts: 1,
        })
    }

    async fn validate_api_key(&self, api_key: &str) -> KeyValidation {
        KeyValidation {
            valid: api_key == "test-key",
            message: String::new(),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn png_base64() -> String {
    let mut bytes = Vec::new();
    RgbImage::from_pixel(24, 16, image::Rgb([240, 180, 30]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    STANDARD.encode(bytes)
}

pub struct StaticConfig {
    pub concurrency: usize,
    pub limits: SpendLimits,
}

impl ConfigProvider for StaticConfig {
    fn api_key(&self) -> Option<String> {
        Some("test-key".to_string())
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn spend_limits(&self) -> SpendLimits {
        self.limits
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub store: SqliteStore,
    pub queue: GenerationQueue,
    pub generator: Arc<MockGenerator>,
}

pub fn open_store(dir: &TempDir) -> anyhow::Result<SqliteStore> {
    Ok(SqliteStore::open(dir.path().join("sfumato.db"))?)
}

pub async fn start_with(
    dir: TempDir,
    store: SqliteStore,
    generator: MockGenerator,
    concurrency: usize,
    limits: SpendLimits,
) -> anyhow::Result<Harness> {
    let generator = Arc::new(generator);
    let artifacts = ArtifactStore::new(store.clone(), dir.path().join("artifacts"))?;
    let queue = GenerationQueue::start(QueueDependencies {
        store: store.clone(),
        artifacts,
        generator: generator.clone(),
        config: Arc::new(StaticConfig {
            concurrency,
            limits,
        }),
        projects: Arc::new(StoreProjectLookup::new(store.clone())),
    })
    .await?;
    Ok(Harness {
        dir,
        store,
        queue,
        generator,
    })
}

pub async fn start(
    generator: MockGenerator,
    concurrency: usize,
    limits: SpendLimits,
) -> anyhow::Result<Harness> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    start_with(dir, store, generator, concurrency, limits).await
}

/// Await `wait_idle` with a generous ceiling so a hang fails the test.
pub async fn settle(queue: &GenerationQueue) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(10), queue.wait_idle()).await??;
    Ok(())
}
