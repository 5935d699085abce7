//! Exclusive right to dispatch jobs from one database.
//!
//! Only the lease holder may claim pending jobs or return `running` rows to
//! `pending`. Handles that only enqueue, cancel or inspect never take it, so
//! they cannot disturb jobs another process is executing.

use sfumato_database::SqliteStore;
use sfumato_error::{QueueError, QueueErrorKind, SfumatoResult};
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Held for as long as a dispatcher may run jobs. Dropping the lease
/// releases the lock.
#[derive(Debug)]
pub(crate) struct DispatchLease {
    _lock_file: File,
    path: PathBuf,
}

impl DispatchLease {
    /// Lock file guarding the database at `database`.
    pub(crate) fn lock_path(database: &Path) -> PathBuf {
        let mut name = database.as_os_str().to_owned();
        name.push(".dispatch.lock");
        PathBuf::from(name)
    }

    /// Take the lease without waiting.
    ///
    /// # Errors
    ///
    /// - [`QueueErrorKind::DispatcherBusy`] if another handle holds it
    /// - [`QueueErrorKind::Lease`] if the lock file cannot be opened or locked
    pub(crate) fn try_acquire(database: &Path) -> Result<Self, QueueError> {
        let path = Self::lock_path(database);
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                QueueError::new(QueueErrorKind::Lease(format!(
                    "opening {}: {}",
                    path.display(),
                    e
                )))
            })?;

        match lock_file.try_lock() {
            Ok(()) => {
                debug!(path = %path.display(), "Dispatch lease acquired");
                Ok(Self {
                    _lock_file: lock_file,
                    path,
                })
            }
            Err(TryLockError::WouldBlock) => Err(QueueError::new(QueueErrorKind::DispatcherBusy(
                database.display().to_string(),
            ))),
            Err(TryLockError::Error(e)) => Err(QueueError::new(QueueErrorKind::Lease(format!(
                "locking {}: {}",
                path.display(),
                e
            )))),
        }
    }
}

/// Take the lease for `store`, then return jobs left `running` by a
/// previous holder to `pending`.
///
/// Rows are only requeued once the lease is held, so a live dispatcher's
/// jobs are never reset.
pub(crate) async fn claim(store: &SqliteStore) -> SfumatoResult<DispatchLease> {
    let lease = DispatchLease::try_acquire(store.path())?;
    let requeued = store.requeue_running_jobs().await?;
    if requeued > 0 {
        info!(requeued, "Recovered interrupted jobs");
    }
    Ok(lease)
}

impl Drop for DispatchLease {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Dispatch lease released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_lease_on_same_database_is_refused() {
        let dir = TempDir::new().unwrap();
        let database = dir.path().join("jobs.db");

        let first = DispatchLease::try_acquire(&database).unwrap();
        let err = DispatchLease::try_acquire(&database).unwrap_err();
        assert!(matches!(err.kind, QueueErrorKind::DispatcherBusy(_)));

        drop(first);
        assert!(DispatchLease::try_acquire(&database).is_ok());
    }

    #[test]
    fn leases_on_different_databases_are_independent() {
        let dir = TempDir::new().unwrap();
        let _a = DispatchLease::try_acquire(&dir.path().join("a.db")).unwrap();
        let _b = DispatchLease::try_acquire(&dir.path().join("b.db")).unwrap();
        assert!(DispatchLease::lock_path(&dir.path().join("a.db")).exists());
    }
}
