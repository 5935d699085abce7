//! Dispatch, ordering, cancellation and failure handling.

mod common;

use common::{MockGenerator, StaticConfig, open_store, settle, start, start_with};
use sfumato_core::{
    CostWindow, GenerationRequest, ImageModel, JobStatus, QueueEvent, QueueJob, ReferenceLabel,
};
use sfumato_database::{BrandAssetRow, NewProjectRow};
use sfumato_error::{QueueErrorKind, SfumatoErrorKind};
use sfumato_interface::SpendLimits;
use sfumato_queue::{GenerationQueue, QueueDependencies};
use sfumato_storage::{ArtifactStore, StoreProjectLookup};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

fn flash(prompt: &str) -> GenerationRequest {
    GenerationRequest::new(ImageModel::Gemini25FlashImage, prompt)
}

async fn next_started(events: &mut broadcast::Receiver<QueueEvent>) -> anyhow::Result<String> {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv()).await??;
        if let QueueEvent::JobStarted { job_id } = event {
            return Ok(job_id);
        }
    }
}

#[tokio::test]
async fn batch_of_three_runs_to_completion() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::from_millis(20)), 2, SpendLimits::default()).await?;

    let mut request = flash("three paper lanterns");
    request.batch_count = Some(3);
    let ids = h.queue.enqueue(request).await?;
    assert_eq!(ids.len(), 3);

    settle(&h.queue).await?;

    let jobs = h.queue.list_jobs(10).await?;
    assert_eq!(jobs.len(), 3);
    for job in &jobs {
        assert!(ids.contains(job.id()));
        assert_eq!(*job.status(), JobStatus::Completed);
        assert_eq!(job.request().batch_count, Some(1));
        let image_id = job.result_id().as_deref().expect("result id");
        let image = h.store.get_image(image_id).await?.expect("image row");
        assert_eq!(image.model_text.as_deref(), Some("Here you go."));
    }

    let spent = h.store.get_session_cost(CostWindow::All).await?;
    assert!((spent - 3.0 * 0.039).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn oversized_batch_is_clamped() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::ZERO), 2, SpendLimits::default()).await?;
    h.queue.pause().await?;

    let mut request = flash("many moons");
    request.batch_count = Some(9);
    assert_eq!(h.queue.enqueue(request).await?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn never_exceeds_concurrency() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::from_millis(80)), 2, SpendLimits::default()).await?;

    let mut first = flash("tile a");
    first.batch_count = Some(4);
    let mut second = flash("tile b");
    second.batch_count = Some(2);
    h.queue.enqueue(first).await?;
    h.queue.enqueue(second).await?;

    settle(&h.queue).await?;

    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 6);
    assert_eq!(h.generator.max_active.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn raising_concurrency_fills_new_slots() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::from_millis(150)), 1, SpendLimits::default()).await?;
    let mut request = flash("wide");
    request.batch_count = Some(4);
    h.queue.enqueue(request).await?;

    assert_eq!(h.queue.set_concurrency(4).await?, 4);
    assert_eq!(h.queue.snapshot().concurrency, 4);
    settle(&h.queue).await?;
    assert!(h.generator.max_active.load(Ordering::SeqCst) > 1);

    assert_eq!(h.queue.set_concurrency(0).await?, 1);
    assert_eq!(h.queue.set_concurrency(99).await?, 8);
    Ok(())
}

#[tokio::test]
async fn dispatches_by_priority_then_age() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::ZERO), 1, SpendLimits::default()).await?;
    h.queue.pause().await?;

    h.queue.enqueue_with_priority(flash("low"), 0).await?;
    h.queue.enqueue_with_priority(flash("high first"), 5).await?;
    h.queue.enqueue_with_priority(flash("mid"), 2).await?;
    h.queue.enqueue_with_priority(flash("high second"), 5).await?;
    assert!(h.queue.snapshot().paused);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);

    h.queue.resume().await?;
    settle(&h.queue).await?;

    assert_eq!(
        h.generator.prompts(),
        vec!["high first", "high second", "mid", "low"]
    );
    Ok(())
}

#[tokio::test]
async fn cancel_only_affects_pending_jobs() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::from_millis(300)), 1, SpendLimits::default()).await?;
    let mut events = h.queue.subscribe();

    let mut request = flash("two posters");
    request.batch_count = Some(2);
    let ids = h.queue.enqueue(request).await?;

    let running = next_started(&mut events).await?;
    let pending = ids.iter().find(|id| **id != running).expect("second job").clone();

    assert!(!h.queue.cancel(&running).await?);
    assert_eq!(
        *h.queue.get_job(&running).await?.expect("job").status(),
        JobStatus::Running
    );

    assert!(h.queue.cancel(&pending).await?);
    assert!(!h.queue.cancel(&pending).await?);

    settle(&h.queue).await?;
    assert_eq!(
        *h.queue.get_job(&running).await?.expect("job").status(),
        JobStatus::Completed
    );
    assert_eq!(
        *h.queue.get_job(&pending).await?.expect("job").status(),
        JobStatus::Cancelled
    );
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn failure_is_recorded_and_published() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::ZERO), 2, SpendLimits::default()).await?;
    let mut events = h.queue.subscribe();

    let ids = h.queue.enqueue(flash("please fail")).await?;
    settle(&h.queue).await?;

    let job = h.queue.get_job(&ids[0]).await?.expect("job");
    assert_eq!(*job.status(), JobStatus::Failed);
    let message = job.error().as_deref().expect("error message");
    assert!(message.contains("HTTP 400"), "{message}");
    assert!(job.result_id().is_none());

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if let QueueEvent::JobFailed { job_id, .. } = event {
            assert_eq!(job_id, ids[0]);
            saw_failure = true;
        }
    }
    assert!(saw_failure);
    assert_eq!(h.store.get_session_cost(CostWindow::All).await?, 0.0);
    Ok(())
}

#[tokio::test]
async fn failed_job_can_be_retried() -> anyhow::Result<()> {
    let h = start(
        MockGenerator::failing_first(Duration::ZERO, 1),
        1,
        SpendLimits::default(),
    )
    .await?;

    let ids = h.queue.enqueue_with_priority(flash("a bridge"), 3).await?;
    settle(&h.queue).await?;
    assert_eq!(
        *h.queue.get_job(&ids[0]).await?.expect("job").status(),
        JobStatus::Failed
    );

    let retried = h.queue.retry(&ids[0]).await?;
    assert_eq!(retried.len(), 1);
    assert_ne!(retried[0], ids[0]);
    settle(&h.queue).await?;

    let job = h.queue.get_job(&retried[0]).await?.expect("job");
    assert_eq!(*job.status(), JobStatus::Completed);
    assert_eq!(*job.priority(), 3);

    let err = h.queue.retry(&retried[0]).await.unwrap_err();
    assert!(matches!(
        err.kind(),
        SfumatoErrorKind::Queue(e) if matches!(e.kind, QueueErrorKind::InvalidTransition { .. })
    ));
    assert!(h.queue.retry("missing").await.is_err());

    assert_eq!(h.queue.clear_finished().await?, 2);
    assert!(h.queue.list_jobs(10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_request_is_rejected_before_insert() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::ZERO), 1, SpendLimits::default()).await?;
    let err = h.queue.enqueue(flash("   ")).await.unwrap_err();
    assert!(matches!(err.kind(), SfumatoErrorKind::Validation(_)));
    assert!(h.queue.list_jobs(10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn interrupted_jobs_are_recovered_on_start() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let job = QueueJob::pending("left-running", flash("interrupted"), 0, chrono::Utc::now());
    store.insert_queue_job(job).await?;
    assert!(store.mark_queue_job_running("left-running").await?);

    let h = start_with(
        dir,
        store,
        MockGenerator::new(Duration::ZERO),
        1,
        SpendLimits::default(),
    )
    .await?;
    settle(&h.queue).await?;

    let job = h.queue.get_job("left-running").await?.expect("job");
    assert_eq!(*job.status(), JobStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn project_context_shapes_the_request() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let now = chrono::Utc::now().naive_utc();
    let exports = dir.path().join("exports");
    store
        .insert_project(NewProjectRow {
            id: "cafe".to_string(),
            name: "Corner Cafe".to_string(),
            system_prompt: Some("Hand-drawn ink style.".to_string()),
            brand_guidelines: Some("Forest green accents.".to_string()),
            brand_strict_mode: true,
            image_output_dir: Some(exports.to_string_lossy().into_owned()),
            created_at: now,
        })
        .await?;
    let logo = dir.path().join("logo.png");
    std::fs::write(&logo, b"logo")?;
    store
        .insert_brand_asset(BrandAssetRow {
            id: "logo".to_string(),
            project_id: "cafe".to_string(),
            file_path: logo.to_string_lossy().into_owned(),
            mime_type: "image/png".to_string(),
            position: 0,
            created_at: now,
        })
        .await?;

    let h = start_with(dir, store, MockGenerator::new(Duration::ZERO), 1, SpendLimits::default())
        .await?;
    let mut request = flash("a menu board");
    request.project_id = Some("cafe".to_string());
    request.system_prompt = Some("Portrait orientation.".to_string());
    let ids = h.queue.enqueue(request).await?;
    settle(&h.queue).await?;

    let sent = h.generator.requests.lock().unwrap()[0].clone();
    let system_prompt = sent.system_prompt.expect("system prompt");
    assert!(system_prompt.starts_with("Portrait orientation.\n\nHand-drawn ink style."));
    assert!(system_prompt.contains("Brand guidelines:\nForest green accents."));
    assert!(system_prompt.contains("Strictly adhere"));
    let references = sent.reference_images.expect("brand references");
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].label, Some(ReferenceLabel::Style));

    let job = h.queue.get_job(&ids[0]).await?.expect("job");
    let image_id = job.result_id().as_deref().expect("result id");
    let image = h.store.get_image(image_id).await?.expect("image");
    assert!(image.file_path.starts_with(&*exports.to_string_lossy()));
    assert_eq!(image.project_id.as_deref(), Some("cafe"));
    assert!(h.store.list_reference_images(image_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_the_dispatcher() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::ZERO), 1, SpendLimits::default()).await?;
    h.queue.shutdown().await?;

    let err = h.queue.pause().await.unwrap_err();
    assert!(matches!(
        err.kind(),
        SfumatoErrorKind::Queue(e) if matches!(e.kind, QueueErrorKind::ShutDown)
    ));

    let ids = h.queue.enqueue(flash("after hours")).await?;
    let job = h.queue.get_job(&ids[0]).await?.expect("job");
    assert_eq!(*job.status(), JobStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn paused_start_holds_jobs_until_resumed() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let generator = Arc::new(MockGenerator::new(Duration::ZERO));
    let queue = GenerationQueue::start_paused(QueueDependencies {
        store: store.clone(),
        artifacts: ArtifactStore::new(store.clone(), dir.path().join("artifacts"))?,
        generator: generator.clone(),
        config: Arc::new(StaticConfig {
            concurrency: 2,
            limits: SpendLimits::default(),
        }),
        projects: Arc::new(StoreProjectLookup::new(store.clone())),
    })
    .await?;
    assert!(queue.snapshot().paused);

    let ids = queue.enqueue(flash("held back")).await?;
    settle(&queue).await?;
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    let job = store.get_job(&ids[0]).await?.expect("job row");
    assert_eq!(*job.status(), JobStatus::Pending);

    queue.resume().await?;
    settle(&queue).await?;
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

fn deps_on(
    dir: &TempDir,
    store: &sfumato_database::SqliteStore,
    generator: Arc<MockGenerator>,
) -> anyhow::Result<QueueDependencies> {
    Ok(QueueDependencies {
        store: store.clone(),
        artifacts: ArtifactStore::new(store.clone(), dir.path().join("artifacts"))?,
        generator,
        config: Arc::new(StaticConfig {
            concurrency: 1,
            limits: SpendLimits::default(),
        }),
        projects: Arc::new(StoreProjectLookup::new(store.clone())),
    })
}

fn is_busy(err: &sfumato_error::SfumatoError) -> bool {
    matches!(
        err.kind(),
        SfumatoErrorKind::Queue(e) if matches!(e.kind, QueueErrorKind::DispatcherBusy(_))
    )
}

#[tokio::test]
async fn second_handle_leaves_running_jobs_alone() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::from_millis(400)), 1, SpendLimits::default()).await?;
    let mut events = h.queue.subscribe();
    let ids = h.queue.enqueue(flash("slow lighthouse")).await?;
    assert_eq!(next_started(&mut events).await?, ids[0]);

    // A short-lived handle on the same store, as the CLI opens for enqueue.
    let other = GenerationQueue::start_paused(deps_on(&h.dir, &h.store, h.generator.clone())?).await?;
    let job = h.store.get_job(&ids[0]).await?.expect("job");
    assert_eq!(*job.status(), JobStatus::Running);

    let err = other.resume().await.unwrap_err();
    assert!(is_busy(&err), "unexpected error: {}", err);
    assert!(other.snapshot().paused);
    let err = GenerationQueue::start(deps_on(&h.dir, &h.store, h.generator.clone())?)
        .await
        .unwrap_err();
    assert!(is_busy(&err), "unexpected error: {}", err);
    other.shutdown().await?;

    settle(&h.queue).await?;
    let job = h.store.get_job(&ids[0]).await?.expect("job");
    assert_eq!(*job.status(), JobStatus::Completed);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn lease_passes_to_the_next_queue_after_shutdown() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::ZERO), 1, SpendLimits::default()).await?;
    let waiting = GenerationQueue::start_paused(deps_on(&h.dir, &h.store, h.generator.clone())?).await?;
    let ids = waiting.enqueue(flash("second shift")).await?;
    settle(&h.queue).await?;
    h.queue.shutdown().await?;

    let pending = waiting.enqueue(flash("night shift")).await?;
    waiting.resume().await?;
    settle(&waiting).await?;

    for id in [&ids[0], &pending[0]] {
        let job = h.store.get_job(id).await?.expect("job");
        assert_eq!(*job.status(), JobStatus::Completed);
    }
    Ok(())
}

#[tokio::test]
async fn completion_of_a_job_failed_elsewhere_keeps_nothing() -> anyhow::Result<()> {
    let h = start(MockGenerator::new(Duration::from_millis(300)), 1, SpendLimits::default()).await?;
    let mut events = h.queue.subscribe();
    let ids = h.queue.enqueue(flash("overtaken")).await?;
    assert_eq!(next_started(&mut events).await?, ids[0]);

    assert!(h.store.mark_queue_job_failed(&ids[0], "stopped by operator").await?);
    settle(&h.queue).await?;

    let job = h.queue.get_job(&ids[0]).await?.expect("job");
    assert_eq!(*job.status(), JobStatus::Failed);
    assert_eq!(job.error().as_deref(), Some("stopped by operator"));
    assert!(job.result_id().is_none());

    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, QueueEvent::JobCompleted { .. }),
            "unexpected completion: {:?}",
            event
        );
    }
    assert!(h.store.list_images(Default::default()).await?.is_empty());
    assert_eq!(h.store.get_session_cost(CostWindow::All).await?, 0.0);
    let originals = h.dir.path().join("artifacts").join("originals");
    assert_eq!(std::fs::read_dir(originals)?.count(), 0);
    Ok(())
}
