//! Async facade over the SQLite store.

use crate::connection::{DbPool, establish_pool, prepare_schema};
use crate::models::{BrandAssetRow, NewProjectRow, ProjectRow};
use crate::{DatabaseResult, images, jobs, projects, usage};
use chrono::Utc;
use diesel::SqliteConnection;
use sfumato_core::{
    CostWindow, GeneratedImage, ImageQuery, NewGeneratedImage, QueueJob, ReferenceImage,
    UsageLogEntry,
};
use sfumato_error::{DatabaseError, DatabaseErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Crash-consistent storage for jobs, images, and usage.
///
/// Every method checks a connection out of the pool on a blocking thread
/// and runs a single statement or a short transaction. No transaction is
/// held across an await point.
///
/// # Examples
///
/// ```rust,ignore
/// use sfumato_database::SqliteStore;
///
/// let store = SqliteStore::open("sfumato.db")?;
/// let open = store.list_open_queue_jobs().await?;
/// ```
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
    path: Arc<PathBuf>,
    fts_available: Arc<AtomicBool>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("fts_available", &self.fts_available.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or migrations fail.
    pub fn open(path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = path.as_ref();
        let pool = establish_pool(path)?;
        let mut conn = pool.get()?;
        let fts_available = prepare_schema(&mut *conn)?;
        tracing::info!(path = %path.display(), fts_available, "Opened durable store");
        Ok(Self {
            pool,
            path: Arc::new(path.to_path_buf()),
            fts_available: Arc::new(AtomicBool::new(fts_available)),
        })
    }

    /// Database file this store was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether full-text search is served by the FTS5 index.
    pub fn search_index_available(&self) -> bool {
        self.fts_available.load(Ordering::Relaxed)
    }

    async fn run<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> DatabaseResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Task(e.to_string())))?
    }

    // ------------------------------------------------------------------
    // Queue jobs
    // ------------------------------------------------------------------

    /// Append a pending job.
    pub async fn insert_queue_job(&self, job: QueueJob) -> DatabaseResult<()> {
        self.insert_queue_jobs(vec![job]).await
    }

    /// Append pending jobs atomically: all rows or none.
    #[tracing::instrument(skip(self, jobs), fields(count = jobs.len()))]
    pub async fn insert_queue_jobs(&self, jobs: Vec<QueueJob>) -> DatabaseResult<()> {
        self.run(move |conn| jobs::insert_jobs(conn, &jobs)).await
    }

    /// Highest priority, oldest pending job, if any.
    pub async fn get_next_pending_job(&self) -> DatabaseResult<Option<QueueJob>> {
        self.run(jobs::next_pending).await
    }

    /// Job by id.
    pub async fn get_job(&self, job_id: &str) -> DatabaseResult<Option<QueueJob>> {
        let job_id = job_id.to_string();
        self.run(move |conn| jobs::get(conn, &job_id)).await
    }

    /// Most recent jobs first.
    pub async fn list_jobs(&self, limit: i64) -> DatabaseResult<Vec<QueueJob>> {
        self.run(move |conn| jobs::list(conn, limit)).await
    }

    /// Pending and running jobs.
    pub async fn list_open_queue_jobs(&self) -> DatabaseResult<Vec<QueueJob>> {
        self.run(jobs::list_open).await
    }

    /// Claim a pending job. Returns false if it was no longer pending.
    pub async fn mark_queue_job_running(&self, job_id: &str) -> DatabaseResult<bool> {
        let job_id = job_id.to_string();
        self.run(move |conn| jobs::mark_running(conn, &job_id, Utc::now()))
            .await
    }

    /// Record a successful finish.
    pub async fn mark_queue_job_completed(
        &self,
        job_id: &str,
        result_id: &str,
    ) -> DatabaseResult<bool> {
        let job_id = job_id.to_string();
        let result_id = result_id.to_string();
        self.run(move |conn| jobs::mark_completed(conn, &job_id, &result_id, Utc::now()))
            .await
    }

    /// Record a successful finish together with its usage entry.
    ///
    /// Returns false, leaving the usage log untouched, if the job was no
    /// longer running.
    #[tracing::instrument(skip(self, entry))]
    pub async fn complete_queue_job(
        &self,
        job_id: &str,
        result_id: &str,
        entry: UsageLogEntry,
    ) -> DatabaseResult<bool> {
        let job_id = job_id.to_string();
        let result_id = result_id.to_string();
        self.run(move |conn| {
            jobs::complete_with_usage(conn, &job_id, &result_id, &entry, Utc::now())
        })
        .await
    }

    /// Record a failure.
    pub async fn mark_queue_job_failed(&self, job_id: &str, message: &str) -> DatabaseResult<bool> {
        let job_id = job_id.to_string();
        let message = message.to_string();
        self.run(move |conn| jobs::mark_failed(conn, &job_id, &message, Utc::now()))
            .await
    }

    /// Cancel a pending job. Returns false if it was not pending.
    pub async fn mark_queue_job_cancelled(&self, job_id: &str) -> DatabaseResult<bool> {
        let job_id = job_id.to_string();
        self.run(move |conn| jobs::mark_cancelled(conn, &job_id, Utc::now()))
            .await
    }

    /// Return crash leftovers in `running` to `pending`.
    #[tracing::instrument(skip(self))]
    pub async fn requeue_running_jobs(&self) -> DatabaseResult<usize> {
        let count = self.run(jobs::requeue_running).await?;
        if count > 0 {
            tracing::warn!(count, "Requeued jobs left running by a previous process");
        }
        Ok(count)
    }

    /// Delete completed, failed, and cancelled jobs.
    pub async fn clear_finished_jobs(&self) -> DatabaseResult<usize> {
        self.run(jobs::clear_finished).await
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    /// Insert an image row stamped with the current time.
    #[tracing::instrument(skip(self, image), fields(image_id = %image.id))]
    pub async fn insert_image(&self, image: NewGeneratedImage) -> DatabaseResult<()> {
        self.run(move |conn| images::insert(conn, image, Utc::now()))
            .await
    }

    /// Image by id, including soft-deleted ones.
    pub async fn get_image(&self, image_id: &str) -> DatabaseResult<Option<GeneratedImage>> {
        let image_id = image_id.to_string();
        self.run(move |conn| images::get(conn, &image_id)).await
    }

    /// Images matching `query`, newest first.
    pub async fn list_images(&self, query: ImageQuery) -> DatabaseResult<Vec<GeneratedImage>> {
        let fts_available = self.search_index_available();
        self.run(move |conn| images::list(conn, &query, fts_available))
            .await
    }

    /// Full-text search over prompt and model text, newest first.
    pub async fn search_images(&self, text: &str, limit: i64) -> DatabaseResult<Vec<GeneratedImage>> {
        let query = ImageQuery::builder()
            .search(text.to_string())
            .limit(limit)
            .build()
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::Query(e.to_string())))?;
        self.list_images(query).await
    }

    /// Images remixed from `parent_id`.
    pub async fn list_image_children(&self, parent_id: &str) -> DatabaseResult<Vec<GeneratedImage>> {
        let parent_id = parent_id.to_string();
        self.run(move |conn| images::children(conn, &parent_id)).await
    }

    /// Flip the favourite flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the image does not exist.
    pub async fn toggle_favorite(&self, image_id: &str) -> DatabaseResult<bool> {
        let id = image_id.to_string();
        self.run(move |conn| images::toggle_favorite(conn, &id))
            .await?
            .ok_or_else(|| DatabaseError::new(DatabaseErrorKind::NotFound))
    }

    /// Mark an image deleted without removing it.
    pub async fn soft_delete_image(&self, image_id: &str) -> DatabaseResult<bool> {
        let image_id = image_id.to_string();
        self.run(move |conn| images::soft_delete(conn, &image_id, Utc::now()))
            .await
    }

    /// Remove an image row and its references. Used for rollback only.
    pub async fn delete_image_hard(&self, image_id: &str) -> DatabaseResult<bool> {
        let image_id = image_id.to_string();
        self.run(move |conn| images::delete_hard(conn, &image_id))
            .await
    }

    /// Insert a reference image row.
    pub async fn insert_reference_image(&self, reference: ReferenceImage) -> DatabaseResult<()> {
        self.run(move |conn| images::insert_reference(conn, &reference))
            .await
    }

    /// Remove a reference image row.
    pub async fn delete_reference_image(&self, reference_id: &str) -> DatabaseResult<bool> {
        let reference_id = reference_id.to_string();
        self.run(move |conn| images::delete_reference(conn, &reference_id))
            .await
    }

    /// References of an image in position order.
    pub async fn list_reference_images(&self, image_id: &str) -> DatabaseResult<Vec<ReferenceImage>> {
        let image_id = image_id.to_string();
        self.run(move |conn| images::references(conn, &image_id))
            .await
    }

    // ------------------------------------------------------------------
    // Usage
    // ------------------------------------------------------------------

    /// Append a usage entry.
    pub async fn insert_usage_log(&self, entry: UsageLogEntry) -> DatabaseResult<()> {
        self.run(move |conn| usage::insert(conn, &entry)).await
    }

    /// Spend recorded in `window`, in USD.
    pub async fn get_session_cost(&self, window: CostWindow) -> DatabaseResult<f64> {
        let since = window.start(Utc::now());
        self.run(move |conn| usage::cost_since(conn, since)).await
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    /// Insert a project.
    pub async fn insert_project(&self, project: NewProjectRow) -> DatabaseResult<()> {
        self.run(move |conn| projects::insert(conn, &project)).await
    }

    /// Project by id.
    pub async fn get_project(&self, project_id: &str) -> DatabaseResult<Option<ProjectRow>> {
        let project_id = project_id.to_string();
        self.run(move |conn| projects::get(conn, &project_id)).await
    }

    /// Insert a brand asset.
    pub async fn insert_brand_asset(&self, asset: BrandAssetRow) -> DatabaseResult<()> {
        self.run(move |conn| projects::insert_asset(conn, &asset))
            .await
    }

    /// Brand assets of a project in position order.
    pub async fn list_brand_assets(&self, project_id: &str) -> DatabaseResult<Vec<BrandAssetRow>> {
        let project_id = project_id.to_string();
        self.run(move |conn| projects::assets(conn, &project_id))
            .await
    }
}
