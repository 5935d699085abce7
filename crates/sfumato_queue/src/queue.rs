//! Public scheduler handle.

use crate::admission;
use crate::dispatcher::{DispatchMessage, Dispatcher, QueueSnapshot};
use crate::lease;
use crate::runner::Shared;
use chrono::{TimeDelta, Utc};
use sfumato_core::{GenerationRequest, JobStatus, QueueEvent, QueueJob, clamp_concurrency};
use sfumato_database::SqliteStore;
use sfumato_error::{QueueError, QueueErrorKind, SfumatoResult};
use sfumato_interface::{ConfigProvider, ImageGenerator, ProjectLookup};
use sfumato_storage::ArtifactStore;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const COMMAND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// Collaborators the scheduler is built from.
pub struct QueueDependencies {
    /// Durable store holding jobs, images and usage
    pub store: SqliteStore,
    /// Writes generated images to disk
    pub artifacts: ArtifactStore,
    /// Remote generation service
    pub generator: Arc<dyn ImageGenerator>,
    /// Live API key, concurrency and spend ceilings
    pub config: Arc<dyn ConfigProvider>,
    /// Project settings and brand assets
    pub projects: Arc<dyn ProjectLookup>,
}

/// Handle to the generation scheduler.
///
/// Cloning is cheap; every clone talks to the same dispatcher. The
/// dispatcher stops once [`GenerationQueue::shutdown`] is called or the
/// last handle is dropped and in-flight jobs have finished.
#[derive(Clone)]
pub struct GenerationQueue {
    shared: Arc<Shared>,
    commands: mpsc::Sender<DispatchMessage>,
    snapshot: watch::Receiver<QueueSnapshot>,
}

impl std::fmt::Debug for GenerationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationQueue")
            .field("snapshot", &*self.snapshot.borrow())
            .finish_non_exhaustive()
    }
}

impl GenerationQueue {
    /// Take the store's dispatch lease, recover jobs left `running` by a
    /// previous process, then start dispatching.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`QueueErrorKind::DispatcherBusy`] if another queue already
    ///   dispatches from this store
    /// - Database error if crash recovery fails
    pub async fn start(deps: QueueDependencies) -> SfumatoResult<Self> {
        Self::launch(deps, false).await
    }

    /// Like [`GenerationQueue::start`], but nothing is dispatched until
    /// [`GenerationQueue::resume`] is called.
    ///
    /// Useful for a short-lived process that only enqueues or inspects
    /// jobs and leaves execution to a later run. A paused queue takes no
    /// lease and leaves `running` rows alone, so it is safe to open next to
    /// a live dispatcher.
    pub async fn start_paused(deps: QueueDependencies) -> SfumatoResult<Self> {
        Self::launch(deps, true).await
    }

    #[instrument(skip(deps))]
    async fn launch(deps: QueueDependencies, paused: bool) -> SfumatoResult<Self> {
        let lease = if paused {
            None
        } else {
            Some(lease::claim(&deps.store).await?)
        };

        let concurrency = clamp_concurrency(deps.config.concurrency());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            store: deps.store,
            artifacts: deps.artifacts,
            generator: deps.generator,
            config: deps.config,
            projects: deps.projects,
            events,
            admission: Mutex::new(()),
        });

        let (commands, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (snapshot_tx, snapshot) = watch::channel(QueueSnapshot {
            in_flight: 0,
            paused,
            concurrency,
            idle: paused,
        });
        let dispatcher = Dispatcher::new(
            Arc::clone(&shared),
            commands_rx,
            snapshot_tx,
            concurrency,
            lease,
        );
        tokio::spawn(dispatcher.run());

        Ok(Self {
            shared,
            commands,
            snapshot,
        })
    }

    /// Enqueue a request at default priority. See
    /// [`GenerationQueue::enqueue_with_priority`].
    pub async fn enqueue(&self, request: GenerationRequest) -> SfumatoResult<Vec<String>> {
        self.enqueue_with_priority(request, 0).await
    }

    /// Validate, admit and insert one pending job per batch unit.
    ///
    /// The batch count is normalized into `1..=4` and each job stores the
    /// request with a batch count of one. The whole batch's cost is checked
    /// against the spend ceilings first; on rejection nothing is inserted.
    ///
    /// # Errors
    ///
    /// - Validation error for a malformed request
    /// - [`QueueErrorKind::SpendLimitExceeded`] when a ceiling would be exceeded
    /// - Database error if the jobs cannot be inserted
    #[instrument(skip(self, request), fields(model = %request.model))]
    pub async fn enqueue_with_priority(
        &self,
        request: GenerationRequest,
        priority: i32,
    ) -> SfumatoResult<Vec<String>> {
        request.validate()?;

        let count = request.normalized_batch_count();
        let additional = request.batch_cost();
        let now = Utc::now();
        let jobs: Vec<QueueJob> = (0..count)
            .map(|unit| {
                QueueJob::pending(
                    Uuid::new_v4().to_string(),
                    request.clone(),
                    priority,
                    // Keeps batch units in order within the same priority.
                    now + TimeDelta::microseconds(i64::from(unit)),
                )
            })
            .collect();
        let ids: Vec<String> = jobs.iter().map(|job| job.id().clone()).collect();

        {
            let _guard = self.shared.admission.lock().await;
            let limits = self.shared.config.spend_limits();
            admission::check(&self.shared.store, &limits, additional, None).await?;
            self.shared.store.insert_queue_jobs(jobs).await?;
        }

        info!(count, priority, cost = additional, "Enqueued jobs");
        self.shared.emit(QueueEvent::QueueChanged);
        self.nudge().await;
        Ok(ids)
    }

    /// Most recent jobs, newest first.
    pub async fn list_jobs(&self, limit: usize) -> SfumatoResult<Vec<QueueJob>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(self.shared.store.list_jobs(limit).await?)
    }

    /// Job by id.
    pub async fn get_job(&self, job_id: &str) -> SfumatoResult<Option<QueueJob>> {
        Ok(self.shared.store.get_job(job_id).await?)
    }

    /// Stop dispatching new jobs. In-flight jobs keep running.
    pub async fn pause(&self) -> SfumatoResult<()> {
        self.call(DispatchMessage::Pause).await?;
        self.shared.emit(QueueEvent::QueueChanged);
        Ok(())
    }

    /// Resume dispatching.
    ///
    /// A queue started paused takes the dispatch lease and recovers
    /// interrupted jobs here.
    ///
    /// # Errors
    ///
    /// - [`QueueErrorKind::DispatcherBusy`] if another queue dispatches
    ///   from this store; the queue stays paused
    /// - [`QueueErrorKind::ShutDown`] if the dispatcher stopped
    pub async fn resume(&self) -> SfumatoResult<()> {
        self.call(DispatchMessage::Resume).await??;
        self.shared.emit(QueueEvent::QueueChanged);
        Ok(())
    }

    /// Cancel a pending job.
    ///
    /// Returns `false` without changing anything if the job is not pending;
    /// running work is never interrupted.
    #[instrument(skip(self))]
    pub async fn cancel(&self, job_id: &str) -> SfumatoResult<bool> {
        let cancelled = self.shared.store.mark_queue_job_cancelled(job_id).await?;
        if cancelled {
            info!("Job cancelled");
            self.shared.emit(QueueEvent::QueueChanged);
        }
        Ok(cancelled)
    }

    /// Set the slot count, clamped into `1..=8`, and dispatch into any new
    /// slots. Returns the clamped value.
    pub async fn set_concurrency(&self, concurrency: usize) -> SfumatoResult<usize> {
        let applied = self
            .call(|ack| DispatchMessage::SetConcurrency(concurrency, ack))
            .await?;
        self.shared.emit(QueueEvent::QueueChanged);
        Ok(applied)
    }

    /// Enqueue a copy of a failed or cancelled job's request at the same
    /// priority.
    ///
    /// # Errors
    ///
    /// - [`QueueErrorKind::JobNotFound`] for an unknown id
    /// - [`QueueErrorKind::InvalidTransition`] if the job did not fail or was not cancelled
    /// - Any error from [`GenerationQueue::enqueue_with_priority`]
    #[instrument(skip(self))]
    pub async fn retry(&self, job_id: &str) -> SfumatoResult<Vec<String>> {
        let job = self
            .get_job(job_id)
            .await?
            .ok_or_else(|| QueueError::new(QueueErrorKind::JobNotFound(job_id.to_string())))?;
        if !matches!(job.status(), JobStatus::Failed | JobStatus::Cancelled) {
            return Err(QueueError::new(QueueErrorKind::InvalidTransition {
                job_id: job_id.to_string(),
                status: job.status().to_string(),
                message: "only failed or cancelled jobs can be retried".to_string(),
            })
            .into());
        }
        self.enqueue_with_priority(job.request().clone(), *job.priority())
            .await
    }

    /// Delete completed, failed and cancelled jobs. Returns how many.
    pub async fn clear_finished(&self) -> SfumatoResult<usize> {
        let removed = self.shared.store.clear_finished_jobs().await?;
        if removed > 0 {
            self.shared.emit(QueueEvent::QueueChanged);
        }
        Ok(removed)
    }

    /// Check whether `additional` USD would be admitted right now.
    ///
    /// # Errors
    ///
    /// Returns [`QueueErrorKind::SpendLimitExceeded`] naming the ceiling.
    pub async fn check_admission(&self, additional: f64) -> SfumatoResult<()> {
        let limits = self.shared.config.spend_limits();
        admission::check(&self.shared.store, &limits, additional, None).await
    }

    /// Current dispatcher state.
    pub fn snapshot(&self) -> QueueSnapshot {
        *self.snapshot.borrow()
    }

    /// Receive queue events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.shared.events.subscribe()
    }

    /// Resolve once nothing is in flight and nothing is dispatchable, either
    /// because no eligible job is pending or because the queue is paused.
    ///
    /// # Errors
    ///
    /// Returns [`QueueErrorKind::ShutDown`] if the dispatcher stopped.
    pub async fn wait_idle(&self) -> SfumatoResult<()> {
        // Round trip first so the snapshot reflects every earlier command.
        self.call(|ack| DispatchMessage::Kick(Some(ack))).await?;
        let mut snapshot = self.snapshot.clone();
        snapshot
            .wait_for(|s| s.idle)
            .await
            .map_err(|_| QueueError::new(QueueErrorKind::ShutDown))?;
        Ok(())
    }

    /// Stop dispatching and wait for in-flight jobs to finish. Pending jobs
    /// stay pending for the next start.
    pub async fn shutdown(&self) -> SfumatoResult<()> {
        self.call(DispatchMessage::Shutdown).await
    }

    async fn nudge(&self) {
        if self
            .commands
            .send(DispatchMessage::Kick(None))
            .await
            .is_err()
        {
            warn!("Dispatcher is not running; jobs stay pending");
        }
    }

    async fn call<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> DispatchMessage,
    ) -> SfumatoResult<T> {
        let (ack, reply) = oneshot::channel();
        self.commands
            .send(message(ack))
            .await
            .map_err(|_| QueueError::new(QueueErrorKind::ShutDown))?;
        Ok(reply
            .await
            .map_err(|_| QueueError::new(QueueErrorKind::ShutDown))?)
    }
}
