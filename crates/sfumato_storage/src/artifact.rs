//! Atomic persistence of generated images.

use crate::payload::{decode_payload, extension_for_mime};
use crate::thumbnail::{Thumbnail, render_thumbnail};
use crate::undo::{UndoAction, UndoLog};
use sfumato_core::{
    GeneratedImage, GenerationRequest, ImagePayload, MAX_ASSET_BYTES, NewGeneratedImage,
    ReferenceImage, effective_resolution,
};
use sfumato_database::SqliteStore;
use sfumato_error::{SfumatoResult, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Upper bound on a generated image, which the service may return larger
/// than an uploaded asset.
const MAX_GENERATED_BYTES: u64 = 64 * 1024 * 1024;

/// Everything needed to persist one generated image.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactInput<'a> {
    /// Request the image answers; its explicit references are stored too
    pub request: &'a GenerationRequest,
    /// First image of the response
    pub image: &'a ImagePayload,
    /// Text the model returned alongside the image
    pub model_text: Option<&'a str>,
    /// Wall time of the remote call
    pub generation_ms: i64,
    /// Estimated USD cost
    pub cost_estimate: f64,
    /// Project override for where the original is written
    pub output_dir: Option<&'a Path>,
}

/// Writes originals, thumbnails and references under a base directory and
/// records them in the durable store.
///
/// Layout:
///
/// ```text
/// {base_dir}/
/// ├── originals/<id>.<ext>
/// ├── thumbnails/<id>.jpg
/// └── references/<id>_<position>.<ext>
/// ```
///
/// Either every file and row of one persist call exists afterwards, or none
/// does.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    store: SqliteStore,
    base_dir: PathBuf,
}

impl ArtifactStore {
    /// Create the store, creating the directory layout if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::DirectoryCreation`] if a directory cannot
    /// be created.
    #[instrument(skip(store, base_dir))]
    pub fn new(store: SqliteStore, base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let artifacts = Self {
            store,
            base_dir: base_dir.into(),
        };
        for dir in [
            artifacts.originals_dir(),
            artifacts.thumbnails_dir(),
            artifacts.references_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
            })?;
        }
        info!(path = %artifacts.base_dir.display(), "Created artifact storage");
        Ok(artifacts)
    }

    /// Root directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Default directory for originals.
    pub fn originals_dir(&self) -> PathBuf {
        self.base_dir.join("originals")
    }

    /// Directory for thumbnails.
    pub fn thumbnails_dir(&self) -> PathBuf {
        self.base_dir.join("thumbnails")
    }

    /// Directory for reference images.
    pub fn references_dir(&self) -> PathBuf {
        self.base_dir.join("references")
    }

    /// Durable store backing this artifact store.
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Persist a generated image with its thumbnail and references.
    ///
    /// On failure every file written and every row inserted by this call is
    /// removed, newest first, before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns a storage error for a malformed or oversized payload, an
    /// undecodable image, or a failed write, and a database error if a row
    /// cannot be inserted.
    #[instrument(skip(self, input), fields(model = %input.request.model))]
    pub async fn persist_generated_image(&self, input: ArtifactInput<'_>) -> SfumatoResult<String> {
        let bytes = decode_payload(&input.image.data_base64, MAX_GENERATED_BYTES)?;
        let image_id = Uuid::new_v4().to_string();
        let output_dir = self.resolve_output_dir(input.output_dir).await;

        let mut undo = UndoLog::new();
        match self
            .write_artifacts(&image_id, bytes, &output_dir, input, &mut undo)
            .await
        {
            Ok(()) => {
                undo.commit();
                info!(image_id = %image_id, "Persisted generated image");
                Ok(image_id)
            }
            Err(e) => {
                warn!(image_id = %image_id, error = %e, "Artifact persistence failed, rolling back");
                undo.rollback(&self.store).await;
                Err(e)
            }
        }
    }

    async fn write_artifacts(
        &self,
        image_id: &str,
        bytes: Vec<u8>,
        output_dir: &Path,
        input: ArtifactInput<'_>,
        undo: &mut UndoLog,
    ) -> SfumatoResult<()> {
        let extension = extension_for_mime(&input.image.mime_type);
        let file_path = output_dir.join(format!("{}.{}", image_id, extension));
        let file_size = bytes.len() as i64;
        write_file(&file_path, &bytes, undo).await?;

        let thumbnail = tokio::task::spawn_blocking(move || render_thumbnail(&bytes))
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Task(e.to_string())))??;
        let Thumbnail {
            width,
            height,
            jpeg,
        } = thumbnail;
        let thumb_path = self.thumbnails_dir().join(format!("{}.jpg", image_id));
        write_file(&thumb_path, &jpeg, undo).await?;

        let request = input.request;
        let row = NewGeneratedImage {
            id: image_id.to_string(),
            project_id: request.project_id.clone(),
            prompt: request.prompt.clone(),
            model: request.model,
            aspect_ratio: request.aspect_ratio,
            resolution: effective_resolution(request.model, request.resolution),
            thinking_level: request.thinking_level,
            used_search: request.uses_search(),
            model_text: input.model_text.map(str::to_string),
            file_path: path_string(&file_path),
            thumb_path: Some(path_string(&thumb_path)),
            width: i32::try_from(width).ok(),
            height: i32::try_from(height).ok(),
            file_size,
            parent_id: request.parent_id.clone(),
            generation_ms: input.generation_ms,
            cost_estimate: input.cost_estimate,
        };
        self.store.insert_image(row).await?;
        undo.record(UndoAction::DeleteImageRow(image_id.to_string()));

        for (position, reference) in request.references().iter().enumerate() {
            let data = decode_payload(&reference.data_base64, MAX_ASSET_BYTES)?;
            let path = self.references_dir().join(format!(
                "{}_{}.{}",
                image_id,
                position,
                extension_for_mime(&reference.mime_type)
            ));
            write_file(&path, &data, undo).await?;

            let reference_id = Uuid::new_v4().to_string();
            self.store
                .insert_reference_image(ReferenceImage {
                    id: reference_id.clone(),
                    image_id: image_id.to_string(),
                    file_path: path_string(&path),
                    label: reference.label.unwrap_or_default(),
                    position: i32::try_from(position).unwrap_or(i32::MAX),
                })
                .await?;
            undo.record(UndoAction::DeleteReferenceRow(reference_id));
        }

        Ok(())
    }

    /// Project override when it is absolute and can be created, otherwise
    /// the default originals directory.
    async fn resolve_output_dir(&self, requested: Option<&Path>) -> PathBuf {
        let Some(dir) = requested else {
            return self.originals_dir();
        };
        if !dir.is_absolute() {
            warn!(path = %dir.display(), "Ignoring relative project output directory");
            return self.originals_dir();
        }
        match tokio::fs::create_dir_all(dir).await {
            Ok(()) => dir.to_path_buf(),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Project output directory unusable, using default");
                self.originals_dir()
            }
        }
    }

    /// Hard-delete an image with its references and every file they point to.
    ///
    /// Returns `false` if the image does not exist. Rows go first so that a
    /// file left behind by a failed removal is never reachable.
    #[instrument(skip(self))]
    pub async fn delete_image_files(&self, image_id: &str) -> SfumatoResult<bool> {
        let Some(image) = self.store.get_image(image_id).await? else {
            return Ok(false);
        };
        let references = self.store.list_reference_images(image_id).await?;
        if !self.store.delete_image_hard(image_id).await? {
            return Ok(false);
        }

        let paths = std::iter::once(image.file_path.clone())
            .chain(image.thumb_path.clone())
            .chain(references.into_iter().map(|r| r.file_path));
        for path in paths {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path, error = %e, "Failed to remove artifact file");
                }
            }
        }
        debug!(image_id = %image_id, "Deleted image artifacts");
        Ok(true)
    }

    /// Look up a persisted image.
    pub async fn image(&self, image_id: &str) -> SfumatoResult<Option<GeneratedImage>> {
        Ok(self.store.get_image(image_id).await?)
    }
}

/// Write through a temporary sibling and rename into place, recording the
/// final path in `undo` once it exists.
async fn write_file(path: &Path, data: &[u8], undo: &mut UndoLog) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                parent.display(),
                e
            )))
        })?;
    }

    let temp_path = path.with_extension("tmp");
    stage(&temp_path, tokio::fs::write(&temp_path, data)).await?;

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(StorageError::new(StorageErrorKind::FileWrite(format!(
            "rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        ))));
    }

    undo.record(UndoAction::RemoveFile(path.to_path_buf()));
    debug!(path = %path.display(), size = data.len(), "Wrote artifact file");
    Ok(())
}

/// Await a write into `temp_path`. On failure whatever it left behind is
/// removed before the error is returned.
async fn stage(
    temp_path: &Path,
    write: impl Future<Output = std::io::Result<()>>,
) -> Result<(), StorageError> {
    let Err(e) = write.await else {
        return Ok(());
    };
    if let Err(cleanup) = tokio::fs::remove_file(temp_path).await {
        if cleanup.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove partial file");
        }
    }
    Err(StorageError::new(StorageErrorKind::FileWrite(format!(
        "{}: {}",
        temp_path.display(),
        e
    ))))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn failed_write_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let temp_path = dir.path().join("image.tmp");

        let err = stage(&temp_path, async {
            tokio::fs::write(&temp_path, b"half an ima").await.unwrap();
            Err::<(), _>(std::io::Error::other("No space left on device"))
        })
        .await
        .unwrap_err();

        assert!(matches!(err.kind, StorageErrorKind::FileWrite(ref m) if m.contains("No space left")));
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn failed_write_before_any_bytes_is_reported() {
        let dir = TempDir::new().unwrap();
        let temp_path = dir.path().join("missing").join("image.tmp");

        let err = stage(&temp_path, tokio::fs::write(&temp_path, b"png")).await.unwrap_err();
        assert!(matches!(err.kind, StorageErrorKind::FileWrite(_)));
    }

    #[tokio::test]
    async fn successful_write_keeps_the_file() {
        let dir = TempDir::new().unwrap();
        let temp_path = dir.path().join("image.tmp");

        stage(&temp_path, tokio::fs::write(&temp_path, b"png")).await.unwrap();
        assert_eq!(std::fs::read(&temp_path).unwrap(), b"png");
    }
}
