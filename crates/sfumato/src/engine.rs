//! Wires configuration, storage, the remote client and the scheduler.

use crate::SfumatoConfig;
use sfumato_database::SqliteStore;
use sfumato_error::{SfumatoResult, StorageError, StorageErrorKind};
use sfumato_interface::{ConfigProvider, ImageGenerator, KeyValidation};
use sfumato_models::GeminiImageClient;
use sfumato_queue::{GenerationQueue, QueueDependencies};
use sfumato_storage::{ArtifactStore, StoreProjectLookup};
use std::sync::Arc;
use tracing::{info, instrument};

/// Opened sfumato installation: database, artifact directories and client.
///
/// The scheduler is started separately so that read-only commands never
/// dispatch jobs.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<SfumatoConfig>,
    store: SqliteStore,
    artifacts: ArtifactStore,
    client: Arc<GeminiImageClient>,
}

impl Engine {
    /// Open the database and artifact directories named by `config`,
    /// creating them if needed.
    ///
    /// # Errors
    ///
    /// Fails if a directory cannot be created, the database cannot be
    /// opened or migrated, or the remote settings are invalid.
    #[instrument(skip_all)]
    pub fn open(config: SfumatoConfig) -> SfumatoResult<Self> {
        let base_dir = config.base_dir();
        let database = config.database_path();
        if let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let store = SqliteStore::open(&database)?;
        let artifacts = ArtifactStore::new(store.clone(), &base_dir)?;
        let client = GeminiImageClient::new(config.gemini_client_config()?)?;
        info!(
            base_dir = %base_dir.display(),
            database = %database.display(),
            "Opened sfumato"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            artifacts,
            client: Arc::new(client),
        })
    }

    /// Effective configuration.
    pub fn config(&self) -> &SfumatoConfig {
        &self.config
    }

    /// Durable store.
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Artifact store.
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Start the scheduler and begin dispatching pending jobs.
    pub async fn start_queue(&self) -> SfumatoResult<GenerationQueue> {
        GenerationQueue::start(self.dependencies()).await
    }

    /// Start the scheduler without dispatching anything.
    pub async fn start_queue_paused(&self) -> SfumatoResult<GenerationQueue> {
        GenerationQueue::start_paused(self.dependencies()).await
    }

    /// Probe the configured API key against the remote service.
    pub async fn validate_api_key(&self) -> KeyValidation {
        let key = self.config.api_key().unwrap_or_default();
        self.client.validate_api_key(&key).await
    }

    fn dependencies(&self) -> QueueDependencies {
        QueueDependencies {
            store: self.store.clone(),
            artifacts: self.artifacts.clone(),
            generator: self.client.clone(),
            config: self.config.clone(),
            projects: Arc::new(StoreProjectLookup::new(self.store.clone())),
        }
    }
}
