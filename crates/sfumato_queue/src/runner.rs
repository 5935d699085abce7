//! Execution of a single dispatched job.

use crate::admission;
use crate::context::resolve_job;
use chrono::Utc;
use sfumato_core::{QueueEvent, QueueJob, UsageLogEntry, effective_resolution};
use sfumato_database::SqliteStore;
use sfumato_error::{GeminiError, GeminiErrorKind, SfumatoError, SfumatoResult};
use sfumato_interface::{ConfigProvider, ImageGenerator, ProjectLookup};
use sfumato_storage::{ArtifactInput, ArtifactStore};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, broadcast};
use tracing::{error, info, instrument, warn};

/// Collaborators shared by the scheduler handle, the dispatcher and every
/// running job.
pub(crate) struct Shared {
    pub(crate) store: SqliteStore,
    pub(crate) artifacts: ArtifactStore,
    pub(crate) generator: Arc<dyn ImageGenerator>,
    pub(crate) config: Arc<dyn ConfigProvider>,
    pub(crate) projects: Arc<dyn ProjectLookup>,
    pub(crate) events: broadcast::Sender<QueueEvent>,
    /// Serializes admission decisions with the inserts they admit.
    pub(crate) admission: Mutex<()>,
}

impl Shared {
    pub(crate) fn emit(&self, event: QueueEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Re-check spend for a job that is about to run, excluding its own
    /// reservation from the reserved pool.
    async fn readmit(&self, job: &QueueJob) -> SfumatoResult<()> {
        let _guard = self.admission.lock().await;
        let limits = self.config.spend_limits();
        admission::check(&self.store, &limits, job.reserved_cost(), Some(job.id().as_str())).await
    }
}

/// Run a job already marked `running` to a terminal state.
///
/// Never returns an error: failures are recorded on the job row and
/// published as [`QueueEvent::JobFailed`].
#[instrument(skip(shared, job), fields(job_id = %job.id()))]
pub(crate) async fn run_job(shared: Arc<Shared>, job: QueueJob) {
    match execute(&shared, &job).await {
        Ok(finished) => complete(&shared, &job, finished).await,
        Err(e) => {
            let message = e.user_message();
            warn!(error = %e, "Job failed");
            record_failure(&shared, job.id(), &message).await;
        }
    }
    shared.emit(QueueEvent::QueueChanged);
}

/// Output of a successful generation that has not been committed yet.
struct Finished {
    image_id: String,
    usage: UsageLogEntry,
}

/// Commit the completion and its usage entry together. If the job is no
/// longer running, or the commit fails, the image is discarded and no
/// completion is published.
async fn complete(shared: &Shared, job: &QueueJob, finished: Finished) {
    let Finished { image_id, usage } = finished;
    match shared
        .store
        .complete_queue_job(job.id(), &image_id, usage)
        .await
    {
        Ok(true) => {
            info!(image_id = %image_id, "Job completed");
            shared.emit(QueueEvent::JobCompleted {
                job_id: job.id().clone(),
                image_id,
            });
        }
        Ok(false) => {
            warn!(
                image_id = %image_id,
                "Job was no longer running when it completed; discarding its image"
            );
            discard_artifacts(shared, &image_id).await;
        }
        Err(e) => {
            error!(error = %e, "Failed to record job completion");
            discard_artifacts(shared, &image_id).await;
            let message = SfumatoError::from(e).user_message();
            record_failure(shared, job.id(), &message).await;
        }
    }
}

/// Mark a job failed and publish the failure.
pub(crate) async fn record_failure(shared: &Shared, job_id: &str, message: &str) {
    match shared.store.mark_queue_job_failed(job_id, message).await {
        Ok(true) => {}
        Ok(false) => warn!(job_id, "Job was no longer running when it failed"),
        Err(e) => error!(job_id, error = %e, "Failed to record job failure"),
    }
    shared.emit(QueueEvent::JobFailed {
        job_id: job_id.to_string(),
        message: message.to_string(),
    });
}

async fn execute(shared: &Shared, job: &QueueJob) -> SfumatoResult<Finished> {
    shared.readmit(job).await?;

    let request = job.request();
    let resolved = resolve_job(request, shared.projects.as_ref()).await?;
    let api_key = shared.config.api_key().unwrap_or_default();

    let started = Instant::now();
    let output = shared
        .generator
        .generate(&resolved.request, &api_key)
        .await?;
    let generation_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
    let image = output.images.first().ok_or_else(|| {
        GeminiError::new(GeminiErrorKind::NoImage(
            output.model_text.clone().unwrap_or_default(),
        ))
    })?;
    if output.images.len() > 1 {
        info!(
            returned = output.images.len(),
            "Response carried several images; keeping the first"
        );
    }

    let cost_estimate = request.unit_cost();
    let image_id = shared
        .artifacts
        .persist_generated_image(ArtifactInput {
            request,
            image,
            model_text: output.model_text.as_deref(),
            generation_ms,
            cost_estimate,
            output_dir: resolved.output_dir.as_deref(),
        })
        .await?;

    let usage = UsageLogEntry {
        image_id: Some(image_id.clone()),
        model: request.model,
        resolution: effective_resolution(request.model, request.resolution),
        cost_estimate,
        input_tokens: output.token_usage.and_then(|u| u.input_tokens),
        output_tokens: output.token_usage.and_then(|u| u.output_tokens),
        created_at: Utc::now(),
    };
    Ok(Finished { image_id, usage })
}

async fn discard_artifacts(shared: &Shared, image_id: &str) {
    if let Err(e) = shared.artifacts.delete_image_files(image_id).await {
        error!(image_id, error = %e, "Failed to discard artifacts of a failed job");
    }
}
