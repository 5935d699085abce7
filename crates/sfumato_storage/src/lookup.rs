//! Project lookup backed by the durable store.

use async_trait::async_trait;
use sfumato_core::{BrandAsset, MAX_ASSET_BYTES, ProjectContext};
use sfumato_database::SqliteStore;
use sfumato_error::SfumatoResult;
use sfumato_interface::ProjectLookup;
use std::path::PathBuf;
use tracing::{instrument, warn};

/// Reads project rows from the store and brand asset bytes from disk.
///
/// Missing or oversized asset files are skipped with a warning so one bad
/// asset never blocks generation.
#[derive(Debug, Clone)]
pub struct StoreProjectLookup {
    store: SqliteStore,
}

impl StoreProjectLookup {
    /// Wrap a store.
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProjectLookup for StoreProjectLookup {
    async fn project(&self, project_id: &str) -> SfumatoResult<Option<ProjectContext>> {
        let row = self.store.get_project(project_id).await?;
        Ok(row.map(|row| ProjectContext {
            id: row.id,
            system_prompt: row.system_prompt,
            brand_guidelines: row.brand_guidelines,
            brand_strict_mode: row.brand_strict_mode,
            image_output_dir: row
                .image_output_dir
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        }))
    }

    #[instrument(skip(self))]
    async fn brand_assets(&self, project_id: &str) -> SfumatoResult<Vec<BrandAsset>> {
        let rows = self.store.list_brand_assets(project_id).await?;
        let mut assets = Vec::with_capacity(rows.len());
        for row in rows {
            let size = match tokio::fs::metadata(&row.file_path).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!(path = %row.file_path, error = %e, "Skipping unreadable brand asset");
                    continue;
                }
            };
            if size > MAX_ASSET_BYTES {
                warn!(path = %row.file_path, size, limit = MAX_ASSET_BYTES, "Skipping oversized brand asset");
                continue;
            }
            match tokio::fs::read(&row.file_path).await {
                Ok(data) => assets.push(BrandAsset {
                    mime_type: row.mime_type,
                    data,
                }),
                Err(e) => {
                    warn!(path = %row.file_path, error = %e, "Skipping unreadable brand asset");
                }
            }
        }
        Ok(assets)
    }
}
