use chrono::{Duration, TimeZone, Utc};
use sfumato_core::{
    CostWindow, GenerationRequest, ImageModel, JobStatus, QueueJob, Resolution, UsageLogEntry,
};
use sfumato_database::SqliteStore;
use tempfile::TempDir;

fn open_store() -> anyhow::Result<(TempDir, SqliteStore)> {
    let dir = TempDir::new()?;
    let store = SqliteStore::open(dir.path().join("sfumato.db"))?;
    Ok((dir, store))
}

fn job(id: &str, priority: i32, offset_secs: i64) -> QueueJob {
    let base = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
    QueueJob::pending(
        id,
        GenerationRequest::new(ImageModel::Gemini3ProImagePreview, format!("prompt {}", id)),
        priority,
        base + Duration::seconds(offset_secs),
    )
}

#[tokio::test]
async fn dispatch_order_is_priority_then_age() -> anyhow::Result<()> {
    let (_dir, store) = open_store()?;
    store
        .insert_queue_jobs(vec![job("A", 0, 1), job("B", 5, 2), job("C", 5, 0)])
        .await?;

    let mut order = Vec::new();
    while let Some(next) = store.get_next_pending_job().await? {
        assert!(store.mark_queue_job_running(next.id()).await?);
        order.push(next.id().clone());
    }
    assert_eq!(order, vec!["C", "B", "A"]);
    Ok(())
}

#[tokio::test]
async fn requeue_resets_crash_leftovers() -> anyhow::Result<()> {
    let (_dir, store) = open_store()?;
    store
        .insert_queue_jobs(vec![job("1", 0, 0), job("2", 0, 1), job("3", 0, 2), job("4", 0, 3)])
        .await?;
    for id in ["1", "2", "3"] {
        assert!(store.mark_queue_job_running(id).await?);
    }

    assert_eq!(store.requeue_running_jobs().await?, 3);

    for id in ["1", "2", "3"] {
        let job = store.get_job(id).await?.expect("job exists");
        assert_eq!(*job.status(), JobStatus::Pending);
        assert!(job.started_at().is_none());
        assert!(job.completed_at().is_none());
        assert!(job.error().is_none());
    }
    assert_eq!(store.requeue_running_jobs().await?, 0);
    Ok(())
}

#[tokio::test]
async fn cancel_only_affects_pending_jobs() -> anyhow::Result<()> {
    let (_dir, store) = open_store()?;
    store
        .insert_queue_jobs(vec![job("pending", 0, 0), job("running", 0, 1)])
        .await?;
    assert!(store.mark_queue_job_running("running").await?);

    assert!(!store.mark_queue_job_cancelled("running").await?);
    let running = store.get_job("running").await?.expect("job exists");
    assert_eq!(*running.status(), JobStatus::Running);

    assert!(store.mark_queue_job_cancelled("pending").await?);
    let cancelled = store.get_job("pending").await?.expect("job exists");
    assert_eq!(*cancelled.status(), JobStatus::Cancelled);

    assert!(!store.mark_queue_job_cancelled("missing").await?);
    Ok(())
}

#[tokio::test]
async fn terminal_jobs_never_restart() -> anyhow::Result<()> {
    let (_dir, store) = open_store()?;
    store.insert_queue_jobs(vec![job("done", 0, 0), job("bad", 0, 1)]).await?;

    assert!(store.mark_queue_job_running("done").await?);
    assert!(store.mark_queue_job_completed("done", "img-1").await?);
    assert!(store.mark_queue_job_running("bad").await?);
    assert!(store.mark_queue_job_failed("bad", "HTTP 400").await?);

    assert!(!store.mark_queue_job_running("done").await?);
    assert!(!store.mark_queue_job_failed("done", "late").await?);
    assert!(!store.mark_queue_job_completed("bad", "img-2").await?);

    let done = store.get_job("done").await?.expect("job exists");
    assert_eq!(*done.status(), JobStatus::Completed);
    assert_eq!(done.result_id().as_deref(), Some("img-1"));
    assert!(done.completed_at().is_some());

    let bad = store.get_job("bad").await?.expect("job exists");
    assert_eq!(*bad.status(), JobStatus::Failed);
    assert_eq!(bad.error().as_deref(), Some("HTTP 400"));

    assert_eq!(store.requeue_running_jobs().await?, 0);
    Ok(())
}

#[tokio::test]
async fn open_jobs_and_clearing() -> anyhow::Result<()> {
    let (_dir, store) = open_store()?;
    store
        .insert_queue_jobs(vec![job("p", 0, 0), job("r", 0, 1), job("c", 0, 2)])
        .await?;
    store.mark_queue_job_running("r").await?;
    store.mark_queue_job_cancelled("c").await?;

    let open: Vec<String> = store
        .list_open_queue_jobs()
        .await?
        .into_iter()
        .map(|j| j.id().clone())
        .collect();
    assert_eq!(open, vec!["p", "r"]);

    assert_eq!(store.clear_finished_jobs().await?, 1);
    assert_eq!(store.list_jobs(10).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn batch_insert_is_all_or_nothing() -> anyhow::Result<()> {
    let (_dir, store) = open_store()?;
    store.insert_queue_job(job("dup", 0, 0)).await?;

    let result = store
        .insert_queue_jobs(vec![job("fresh", 0, 1), job("dup", 0, 2)])
        .await;
    assert!(result.is_err());
    assert!(store.get_job("fresh").await?.is_none());
    assert_eq!(store.list_jobs(10).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn stored_request_round_trips() -> anyhow::Result<()> {
    let (_dir, store) = open_store()?;
    let mut request = GenerationRequest::new(ImageModel::Gemini25FlashImage, "tea kettle");
    request.batch_count = Some(4);
    request.project_id = Some("proj".to_string());
    store
        .insert_queue_job(QueueJob::pending("j", request, 3, Utc::now()))
        .await?;

    let stored = store.get_job("j").await?.expect("job exists");
    assert_eq!(stored.request().batch_count, Some(1));
    assert_eq!(stored.request().project_id.as_deref(), Some("proj"));
    assert_eq!(*stored.priority(), 3);
    Ok(())
}

#[tokio::test]
async fn completion_records_usage_only_for_running_jobs() -> anyhow::Result<()> {
    let (_dir, store) = open_store()?;
    store.insert_queue_jobs(vec![job("ok", 0, 0), job("gone", 0, 1)]).await?;
    let usage = |image_id: &str| UsageLogEntry {
        image_id: Some(image_id.to_string()),
        model: ImageModel::Gemini3ProImagePreview,
        resolution: Resolution::OneK,
        cost_estimate: 0.134,
        input_tokens: None,
        output_tokens: None,
        created_at: Utc::now(),
    };

    assert!(store.mark_queue_job_running("ok").await?);
    assert!(store.complete_queue_job("ok", "img-ok", usage("img-ok")).await?);
    let ok = store.get_job("ok").await?.expect("job exists");
    assert_eq!(*ok.status(), JobStatus::Completed);
    assert_eq!(ok.result_id().as_deref(), Some("img-ok"));

    // Failed out from under the runner before it could finish.
    assert!(store.mark_queue_job_running("gone").await?);
    assert!(store.mark_queue_job_failed("gone", "stopped").await?);
    assert!(!store.complete_queue_job("gone", "img-gone", usage("img-gone")).await?);
    let gone = store.get_job("gone").await?.expect("job exists");
    assert_eq!(*gone.status(), JobStatus::Failed);
    assert!(gone.result_id().is_none());

    let spent = store.get_session_cost(CostWindow::All).await?;
    assert!((spent - 0.134).abs() < 1e-9, "spent {}", spent);
    Ok(())
}
