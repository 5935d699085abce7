//! Queue command handlers.

use super::commands::{EnqueueArgs, OutputFormat};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sfumato::Engine;
use sfumato_core::{GenerationRequest, QueueEvent, QueueJob, ReferenceImageInput, ReferenceLabel};
use sfumato_error::{JsonError, SfumatoResult, StorageError, StorageErrorKind, ValidationError};
use sfumato_queue::GenerationQueue;
use sfumato_storage::mime_for_extension;
use std::path::Path;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

/// Queue a request, and optionally process the queue until idle.
pub async fn enqueue(engine: &Engine, args: EnqueueArgs) -> SfumatoResult<()> {
    let wait = args.wait;
    let priority = args.priority;
    let request = build_request(args).await?;

    let queue = if wait {
        engine.start_queue().await?
    } else {
        engine.start_queue_paused().await?
    };

    let ids = queue.enqueue_with_priority(request, priority).await?;
    for id in &ids {
        println!("queued    {}", id);
    }

    if wait {
        follow(&queue).await?;
    }
    queue.shutdown().await
}

/// Process pending jobs until nothing is left to dispatch.
pub async fn run(engine: &Engine, concurrency: Option<usize>) -> SfumatoResult<()> {
    let queue = engine.start_queue().await?;
    if let Some(concurrency) = concurrency {
        let applied = queue.set_concurrency(concurrency).await?;
        debug!(requested = concurrency, applied, "Concurrency overridden");
    }
    follow(&queue).await?;
    queue.shutdown().await
}

/// List jobs, newest first.
pub async fn list(engine: &Engine, limit: usize, format: OutputFormat) -> SfumatoResult<()> {
    let jobs = engine.store().list_jobs(limit as i64).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&jobs)
                .map_err(|e| JsonError::new(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Human => {
            println!(
                "{:<36}  {:<9}  {:>4}  {:<20}  prompt",
                "id", "status", "prio", "created"
            );
            println!("{:-<100}", "");
            for job in &jobs {
                print_job(job);
            }
            println!("Total: {} jobs", jobs.len());
        }
    }
    Ok(())
}

/// Cancel a pending job.
pub async fn cancel(engine: &Engine, id: &str) -> SfumatoResult<()> {
    let queue = engine.start_queue_paused().await?;
    if queue.cancel(id).await? {
        println!("cancelled {}", id);
    } else {
        println!("{} is not pending; nothing to cancel", id);
    }
    queue.shutdown().await
}

/// Queue a copy of a failed or cancelled job.
pub async fn retry(engine: &Engine, id: &str) -> SfumatoResult<()> {
    let queue = engine.start_queue_paused().await?;
    for new_id in queue.retry(id).await? {
        println!("queued    {}", new_id);
    }
    queue.shutdown().await
}

/// Remove terminal jobs.
pub async fn clear(engine: &Engine) -> SfumatoResult<()> {
    let removed = engine.store().clear_finished_jobs().await?;
    println!("Removed {} finished jobs", removed);
    Ok(())
}

fn print_job(job: &QueueJob) {
    let prompt: String = job.request().prompt.chars().take(40).collect();
    println!(
        "{:<36}  {:<9}  {:>4}  {:<20}  {}",
        job.id(),
        job.status(),
        job.priority(),
        job.created_at().format("%Y-%m-%d %H:%M:%S"),
        prompt
    );
    if let Some(error) = job.error() {
        println!("{:>38}{}", "", error);
    }
}

/// Print job events until the queue is idle.
async fn follow(queue: &GenerationQueue) -> SfumatoResult<()> {
    let mut events = queue.subscribe();
    let idle = queue.wait_idle();
    tokio::pin!(idle);

    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed queue events"),
                Err(RecvError::Closed) => break,
            },
            result = &mut idle => {
                result?;
                break;
            }
        }
    }

    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    Ok(())
}

fn print_event(event: &QueueEvent) {
    match event {
        QueueEvent::QueueChanged => {}
        QueueEvent::JobStarted { job_id } => println!("started   {}", job_id),
        QueueEvent::JobCompleted { job_id, image_id } => {
            println!("completed {} -> image {}", job_id, image_id)
        }
        QueueEvent::JobFailed { job_id, message } => println!("failed    {}: {}", job_id, message),
    }
}

async fn build_request(args: EnqueueArgs) -> SfumatoResult<GenerationRequest> {
    let mut references = Vec::new();
    for (paths, label) in [
        (&args.people, ReferenceLabel::Person),
        (&args.references, ReferenceLabel::Object),
        (&args.styles, ReferenceLabel::Style),
    ] {
        for path in paths {
            references.push(read_reference(path, label).await?);
        }
    }

    let mut request = GenerationRequest::new(args.model, args.prompt);
    request.aspect_ratio = args.aspect_ratio;
    request.resolution = args.resolution;
    request.thinking_level = args.thinking;
    request.batch_count = args.batch;
    request.project_id = args.project;
    request.parent_id = args.parent;
    request.system_prompt = args.system_prompt;
    if args.search {
        request.use_google_search = Some(true);
    }
    if !references.is_empty() {
        request.reference_images = Some(references);
    }
    Ok(request)
}

async fn read_reference(path: &Path, label: ReferenceLabel) -> SfumatoResult<ReferenceImageInput> {
    let mime_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_for_extension)
        .ok_or_else(|| {
            ValidationError::new(
                "reference_images",
                format!("{} is not a supported image type", path.display()),
            )
        })?;
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileRead(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })?;

    Ok(ReferenceImageInput {
        mime_type: mime_type.to_string(),
        data_base64: STANDARD.encode(bytes),
        label: Some(label),
    })
}
