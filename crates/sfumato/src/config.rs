//! Layered configuration for the sfumato binary and library users.
//!
//! Sources, in increasing precedence:
//! - Bundled defaults (include_str! from sfumato.toml)
//! - `~/.config/sfumato/sfumato.toml`
//! - `./sfumato.toml`
//! - `GEMINI_API_KEY` from the environment (after loading `.env`)

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use sfumato_core::DEFAULT_CONCURRENCY;
use sfumato_error::{ConfigError, SfumatoError, SfumatoResult};
use sfumato_interface::{ConfigProvider, SpendLimits};
use sfumato_models::{GeminiClientConfig, RetryPolicy};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};

/// Environment variable that overrides `api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_CONFIG: &str = include_str!("../sfumato.toml");

/// Dispatch settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Jobs in flight at once, clamped to `1..=8` by the queue
    pub concurrency: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Spend ceilings in USD.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SpendSettings {
    /// Ceiling for the current calendar month
    pub monthly_limit: Option<f64>,
    /// Ceiling across all recorded usage
    pub total_limit: Option<f64>,
}

/// Where images and the database live.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Artifact root; defaults to `~/.local/share/sfumato`
    pub base_dir: Option<PathBuf>,
    /// Database file; defaults to `<base_dir>/sfumato.db`
    pub database: Option<PathBuf>,
}

/// Remote generation service settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Scheme and host of the service
    pub base_url: String,
    /// Deadline for one generation attempt
    pub generation_timeout_secs: u64,
    /// Deadline for an API key probe
    pub validation_timeout_secs: u64,
    /// Attempts per call, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each later one
    pub base_delay_ms: u64,
    /// Client-side request ceiling
    pub requests_per_minute: Option<u32>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: sfumato_models::DEFAULT_BASE_URL.to_string(),
            generation_timeout_secs: 180,
            validation_timeout_secs: 15,
            max_attempts: 3,
            base_delay_ms: 1000,
            requests_per_minute: None,
        }
    }
}

/// Top-level sfumato configuration.
///
/// # Example
///
/// ```no_run
/// use sfumato::SfumatoConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SfumatoConfig::load()?;
/// println!("database at {}", config.database_path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SfumatoConfig {
    /// Remote service API key
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Dispatch settings
    #[serde(default)]
    pub queue: QueueSettings,
    /// Spend ceilings
    #[serde(default)]
    pub spend: SpendSettings,
    /// Storage locations
    #[serde(default)]
    pub storage: StorageSettings,
    /// Remote service settings
    #[serde(default)]
    pub remote: RemoteSettings,
}

impl std::fmt::Debug for SfumatoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SfumatoConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("queue", &self.queue)
            .field("spend", &self.spend)
            .field("storage", &self.storage)
            .field("remote", &self.remote)
            .finish()
    }
}

impl SfumatoConfig {
    /// Load configuration with precedence: environment > current dir >
    /// home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file cannot be parsed or a value is
    /// out of range.
    #[instrument]
    pub fn load() -> SfumatoResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        let mut files = Vec::new();
        if let Some(home) = dirs::home_dir() {
            files.push(home.join(".config/sfumato/sfumato.toml"));
        }
        files.push(PathBuf::from("sfumato.toml"));

        let mut config = Self::from_files(&files)?;

        if dotenvy::dotenv().is_err() {
            debug!("No .env file loaded");
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config = config.with_api_key(key);
        }
        Ok(config)
    }

    /// Bundled defaults overlaid with each of `paths` in order. Missing
    /// files are skipped. The environment is not consulted.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file cannot be parsed or a value is
    /// out of range.
    #[instrument(skip(paths), fields(sources = paths.len()))]
    pub fn from_files(paths: &[PathBuf]) -> SfumatoResult<Self> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));
        for path in paths {
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }

        let config: Self = builder
            .build()
            .map_err(|e| {
                SfumatoError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                SfumatoError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Replace the API key. Blank keys are ignored.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        let key = key.trim();
        if !key.is_empty() {
            self.api_key = Some(key.to_string());
        }
        self
    }

    /// Reject values no component can work with.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, limit) in [
            ("spend.monthly_limit", self.spend.monthly_limit),
            ("spend.total_limit", self.spend.total_limit),
        ] {
            if let Some(limit) = limit.filter(|l| !(l.is_finite() && *l >= 0.0)) {
                return Err(ConfigError::new(format!(
                    "{} must be a non-negative number, got {}",
                    name, limit
                )));
            }
        }
        if self.remote.base_url.trim().is_empty() {
            return Err(ConfigError::new("remote.base_url must not be empty"));
        }
        if self.remote.generation_timeout_secs == 0 || self.remote.validation_timeout_secs == 0 {
            return Err(ConfigError::new("remote timeouts must be at least one second"));
        }
        if self.remote.requests_per_minute == Some(0) {
            return Err(ConfigError::new(
                "remote.requests_per_minute must be positive; omit it to disable throttling",
            ));
        }
        Ok(())
    }

    /// Artifact root directory.
    pub fn base_dir(&self) -> PathBuf {
        match &self.storage.base_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .map(|home| home.join(".local/share/sfumato"))
                .unwrap_or_else(|| PathBuf::from(".sfumato")),
        }
    }

    /// Database file path.
    pub fn database_path(&self) -> PathBuf {
        match &self.storage.database {
            Some(path) => path.clone(),
            None => self.base_dir().join("sfumato.db"),
        }
    }

    /// Settings for the remote generation client.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the client settings cannot be built.
    pub fn gemini_client_config(&self) -> Result<GeminiClientConfig, ConfigError> {
        let remote = &self.remote;
        let mut builder = GeminiClientConfig::builder();
        builder
            .base_url(remote.base_url.trim_end_matches('/'))
            .generation_timeout(Duration::from_secs(remote.generation_timeout_secs))
            .validation_timeout(Duration::from_secs(remote.validation_timeout_secs))
            .retry(RetryPolicy::new(
                remote.max_attempts,
                Duration::from_millis(remote.base_delay_ms),
            ));
        if let Some(rpm) = remote.requests_per_minute {
            builder.requests_per_minute(rpm);
        }
        builder
            .build()
            .map_err(|e| ConfigError::new(format!("Invalid remote settings: {}", e)))
    }
}

impl ConfigProvider for SfumatoConfig {
    fn api_key(&self) -> Option<String> {
        self.api_key.clone()
    }

    fn concurrency(&self) -> usize {
        self.queue.concurrency
    }

    fn spend_limits(&self) -> SpendLimits {
        SpendLimits {
            monthly: self.spend.monthly_limit,
            total: self.spend.total_limit,
        }
    }
}
