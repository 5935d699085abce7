//! Dispatcher actor owning the in-flight set, pause flag and concurrency.
//!
//! Every dispatch decision runs on this one task, so two decisions never
//! race. Completions come back over a dedicated channel and immediately
//! re-trigger dispatch, which keeps slots filled without polling.

use crate::lease::{self, DispatchLease};
use crate::runner::{Shared, record_failure, run_job};
use serde::{Deserialize, Serialize};
use sfumato_core::{QueueEvent, QueueJob, clamp_concurrency};
use sfumato_error::SfumatoResult;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument, warn};

/// Commands accepted by the dispatcher.
#[derive(Debug)]
pub(crate) enum DispatchMessage {
    /// Re-evaluate dispatch, acknowledging once done
    Kick(Option<oneshot::Sender<()>>),
    /// Stop starting new jobs
    Pause(oneshot::Sender<()>),
    /// Start jobs again, taking the dispatch lease if not yet held
    Resume(oneshot::Sender<SfumatoResult<()>>),
    /// Change the slot count; replies with the clamped value
    SetConcurrency(usize, oneshot::Sender<usize>),
    /// Stop dispatching and reply once in-flight jobs have finished
    Shutdown(oneshot::Sender<()>),
}

/// Point-in-time view of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    /// Jobs currently executing
    pub in_flight: usize,
    /// Whether dispatch is paused
    pub paused: bool,
    /// Slot count
    pub concurrency: usize,
    /// Nothing in flight and nothing dispatchable
    pub idle: bool,
}

pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
    commands: mpsc::Receiver<DispatchMessage>,
    finished_tx: mpsc::UnboundedSender<String>,
    finished_rx: mpsc::UnboundedReceiver<String>,
    snapshot: watch::Sender<QueueSnapshot>,
    in_flight: HashSet<String>,
    lease: Option<DispatchLease>,
    paused: bool,
    concurrency: usize,
    drained: bool,
    closing: bool,
    shutdown_waiters: Vec<oneshot::Sender<()>>,
}

impl Dispatcher {
    pub(crate) fn new(
        shared: Arc<Shared>,
        commands: mpsc::Receiver<DispatchMessage>,
        snapshot: watch::Sender<QueueSnapshot>,
        concurrency: usize,
        lease: Option<DispatchLease>,
    ) -> Self {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        Self {
            shared,
            commands,
            finished_tx,
            finished_rx,
            snapshot,
            in_flight: HashSet::new(),
            paused: lease.is_none(),
            lease,
            concurrency: clamp_concurrency(concurrency),
            drained: false,
            closing: false,
            shutdown_waiters: Vec::new(),
        }
    }

    /// Run until shut down, or until every handle is dropped and the last
    /// in-flight job has finished.
    #[instrument(name = "dispatcher", skip(self))]
    pub(crate) async fn run(mut self) {
        info!(concurrency = self.concurrency, "Dispatcher started");
        self.kick().await;

        loop {
            tokio::select! {
                message = self.commands.recv(), if !self.closing => match message {
                    Some(message) => self.handle(message).await,
                    None => {
                        debug!("All queue handles dropped");
                        self.closing = true;
                        self.publish();
                    }
                },
                Some(job_id) = self.finished_rx.recv() => {
                    self.in_flight.remove(&job_id);
                    debug!(job_id = %job_id, in_flight = self.in_flight.len(), "Job finished");
                    self.kick().await;
                }
            }

            if self.closing && self.in_flight.is_empty() {
                break;
            }
        }

        // Released before acknowledging so a successor can start at once.
        self.lease = None;
        for waiter in self.shutdown_waiters.drain(..) {
            let _ = waiter.send(());
        }
        info!("Dispatcher stopped");
    }

    async fn handle(&mut self, message: DispatchMessage) {
        match message {
            DispatchMessage::Kick(ack) => {
                self.kick().await;
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
            DispatchMessage::Pause(ack) => {
                self.paused = true;
                info!("Queue paused");
                self.publish();
                let _ = ack.send(());
            }
            DispatchMessage::Resume(ack) => {
                if self.lease.is_none() {
                    match lease::claim(&self.shared.store).await {
                        Ok(lease) => self.lease = Some(lease),
                        Err(e) => {
                            warn!(error = %e, "Queue stays paused");
                            let _ = ack.send(Err(e));
                            return;
                        }
                    }
                }
                self.paused = false;
                info!("Queue resumed");
                self.kick().await;
                let _ = ack.send(Ok(()));
            }
            DispatchMessage::SetConcurrency(requested, ack) => {
                self.concurrency = clamp_concurrency(requested);
                info!(requested, concurrency = self.concurrency, "Concurrency changed");
                self.kick().await;
                let _ = ack.send(self.concurrency);
            }
            DispatchMessage::Shutdown(ack) => {
                info!(in_flight = self.in_flight.len(), "Queue shutting down");
                self.closing = true;
                self.shutdown_waiters.push(ack);
                self.publish();
            }
        }
    }

    /// Claim pending jobs until slots run out, dispatch is paused, or
    /// nothing eligible remains.
    async fn kick(&mut self) {
        self.drained = false;
        while !self.closing && !self.paused && self.in_flight.len() < self.concurrency {
            let job = match self.shared.store.get_next_pending_job().await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    self.drained = true;
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to select next pending job");
                    self.drained = true;
                    break;
                }
            };

            match self.shared.store.mark_queue_job_running(job.id()).await {
                Ok(true) => self.start(job),
                Ok(false) => debug!(job_id = %job.id(), "Job left pending before it was claimed"),
                Err(e) => {
                    error!(job_id = %job.id(), error = %e, "Failed to claim job");
                    self.drained = true;
                    break;
                }
            }
        }
        self.publish();
    }

    fn start(&mut self, job: QueueJob) {
        let job_id = job.id().clone();
        self.in_flight.insert(job_id.clone());
        info!(job_id = %job_id, in_flight = self.in_flight.len(), "Dispatching job");
        self.shared.emit(QueueEvent::JobStarted {
            job_id: job_id.clone(),
        });
        self.shared.emit(QueueEvent::QueueChanged);

        let shared = Arc::clone(&self.shared);
        let finished = self.finished_tx.clone();
        tokio::spawn(async move {
            let task = tokio::spawn(run_job(Arc::clone(&shared), job));
            if let Err(e) = task.await {
                error!(job_id = %job_id, error = %e, "Job task aborted");
                record_failure(&shared, &job_id, &format!("Job task aborted: {}", e)).await;
                shared.emit(QueueEvent::QueueChanged);
            }
            let _ = finished.send(job_id);
        });
    }

    fn publish(&self) {
        let in_flight = self.in_flight.len();
        self.snapshot.send_replace(QueueSnapshot {
            in_flight,
            paused: self.paused,
            concurrency: self.concurrency,
            idle: in_flight == 0 && (self.paused || self.drained || self.closing),
        });
    }
}
