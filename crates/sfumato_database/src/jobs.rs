//! Queue job persistence.
//!
//! Every status change is a single conditional `UPDATE`, so a mutation
//! that races with another one simply affects zero rows.

use crate::models::{NewQueueJobRow, QueueJobRow};
use crate::schema::queue_jobs;
use crate::{DatabaseResult, usage};
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use sfumato_core::{JobStatus, QueueJob, UsageLogEntry};

fn to_jobs(rows: Vec<QueueJobRow>) -> DatabaseResult<Vec<QueueJob>> {
    rows.into_iter().map(QueueJob::try_from).collect()
}

/// Insert pending jobs in one transaction.
pub fn insert_jobs(conn: &mut SqliteConnection, jobs: &[QueueJob]) -> DatabaseResult<()> {
    let rows = jobs
        .iter()
        .map(NewQueueJobRow::from_job)
        .collect::<DatabaseResult<Vec<_>>>()?;
    conn.transaction(|conn| {
        diesel::insert_into(queue_jobs::table)
            .values(&rows)
            .execute(conn)
            .map(|_| ())
    })?;
    Ok(())
}

/// Highest priority, oldest pending job.
pub fn next_pending(conn: &mut SqliteConnection) -> DatabaseResult<Option<QueueJob>> {
    queue_jobs::table
        .filter(queue_jobs::status.eq(JobStatus::Pending.as_ref()))
        .order((
            queue_jobs::priority.desc(),
            queue_jobs::created_at.asc(),
            queue_jobs::id.asc(),
        ))
        .select(QueueJobRow::as_select())
        .first(conn)
        .optional()?
        .map(QueueJob::try_from)
        .transpose()
}

/// Job by id.
pub fn get(conn: &mut SqliteConnection, job_id: &str) -> DatabaseResult<Option<QueueJob>> {
    queue_jobs::table
        .find(job_id)
        .select(QueueJobRow::as_select())
        .first(conn)
        .optional()?
        .map(QueueJob::try_from)
        .transpose()
}

/// Most recent jobs first.
pub fn list(conn: &mut SqliteConnection, limit: i64) -> DatabaseResult<Vec<QueueJob>> {
    let rows = queue_jobs::table
        .order((queue_jobs::created_at.desc(), queue_jobs::id.desc()))
        .limit(limit)
        .select(QueueJobRow::as_select())
        .load(conn)?;
    to_jobs(rows)
}

/// Every pending or running job.
pub fn list_open(conn: &mut SqliteConnection) -> DatabaseResult<Vec<QueueJob>> {
    let rows = queue_jobs::table
        .filter(queue_jobs::status.eq_any(vec![JobStatus::Pending.as_ref(), JobStatus::Running.as_ref()]))
        .order(queue_jobs::created_at.asc())
        .select(QueueJobRow::as_select())
        .load(conn)?;
    to_jobs(rows)
}

/// `pending -> running`. Returns false if the job was not pending.
pub fn mark_running(
    conn: &mut SqliteConnection,
    job_id: &str,
    at: DateTime<Utc>,
) -> DatabaseResult<bool> {
    let updated = diesel::update(
        queue_jobs::table
            .filter(queue_jobs::id.eq(job_id))
            .filter(queue_jobs::status.eq(JobStatus::Pending.as_ref())),
    )
    .set((
        queue_jobs::status.eq(JobStatus::Running.as_ref()),
        queue_jobs::started_at.eq(at.naive_utc()),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

/// `running -> completed`. Returns false if the job was not running.
pub fn mark_completed(
    conn: &mut SqliteConnection,
    job_id: &str,
    result_id: &str,
    at: DateTime<Utc>,
) -> DatabaseResult<bool> {
    let updated = diesel::update(
        queue_jobs::table
            .filter(queue_jobs::id.eq(job_id))
            .filter(queue_jobs::status.eq(JobStatus::Running.as_ref())),
    )
    .set((
        queue_jobs::status.eq(JobStatus::Completed.as_ref()),
        queue_jobs::result_id.eq(Some(result_id)),
        queue_jobs::error.eq(None::<String>),
        queue_jobs::completed_at.eq(at.naive_utc()),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

/// `running -> completed` and the job's usage entry in one transaction.
///
/// Returns false, recording no usage, if the job was not running.
pub fn complete_with_usage(
    conn: &mut SqliteConnection,
    job_id: &str,
    result_id: &str,
    entry: &UsageLogEntry,
    at: DateTime<Utc>,
) -> DatabaseResult<bool> {
    conn.transaction(|conn| {
        if !mark_completed(conn, job_id, result_id, at)? {
            return Ok(false);
        }
        usage::insert(conn, entry)?;
        Ok(true)
    })
}

/// `running -> failed`. Returns false if the job was not running.
pub fn mark_failed(
    conn: &mut SqliteConnection,
    job_id: &str,
    message: &str,
    at: DateTime<Utc>,
) -> DatabaseResult<bool> {
    let updated = diesel::update(
        queue_jobs::table
            .filter(queue_jobs::id.eq(job_id))
            .filter(queue_jobs::status.eq(JobStatus::Running.as_ref())),
    )
    .set((
        queue_jobs::status.eq(JobStatus::Failed.as_ref()),
        queue_jobs::error.eq(Some(message)),
        queue_jobs::completed_at.eq(at.naive_utc()),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

/// `pending -> cancelled`. Returns false if the job was not pending.
pub fn mark_cancelled(
    conn: &mut SqliteConnection,
    job_id: &str,
    at: DateTime<Utc>,
) -> DatabaseResult<bool> {
    let updated = diesel::update(
        queue_jobs::table
            .filter(queue_jobs::id.eq(job_id))
            .filter(queue_jobs::status.eq(JobStatus::Pending.as_ref())),
    )
    .set((
        queue_jobs::status.eq(JobStatus::Cancelled.as_ref()),
        queue_jobs::completed_at.eq(at.naive_utc()),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

/// Reset every `running` job to `pending` with timestamps and error cleared.
pub fn requeue_running(conn: &mut SqliteConnection) -> DatabaseResult<usize> {
    let updated = diesel::update(
        queue_jobs::table.filter(queue_jobs::status.eq(JobStatus::Running.as_ref())),
    )
    .set((
        queue_jobs::status.eq(JobStatus::Pending.as_ref()),
        queue_jobs::started_at.eq(None::<NaiveDateTime>),
        queue_jobs::completed_at.eq(None::<NaiveDateTime>),
        queue_jobs::error.eq(None::<String>),
    ))
    .execute(conn)?;
    Ok(updated)
}

/// Delete terminal jobs. Returns how many were removed.
pub fn clear_finished(conn: &mut SqliteConnection) -> DatabaseResult<usize> {
    let deleted = diesel::delete(queue_jobs::table.filter(queue_jobs::status.eq_any(vec![
        JobStatus::Completed.as_ref(),
        JobStatus::Failed.as_ref(),
        JobStatus::Cancelled.as_ref(),
    ])))
    .execute(conn)?;
    Ok(deleted)
}
