//! Connection pool and schema setup.

use crate::{DatabaseResult, search};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use sfumato_error::{DatabaseError, DatabaseErrorKind};
use std::path::Path;
use std::time::Duration;

/// Pool of SQLite connections.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
/// Connection checked out of [`DbPool`].
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const DEFAULT_POOL_SIZE: u32 = 8;

/// Pragmas applied to every connection the pool hands out.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Open a pool on the database file at `path`, creating it if needed.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the pool
/// cannot establish its first connection.
pub fn establish_pool(path: &Path) -> DatabaseResult<DbPool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DatabaseError::new(DatabaseErrorKind::Connection(format!(
                "{}: {}",
                parent.display(),
                e
            )))
        })?;
    }

    let manager = ConnectionManager::<SqliteConnection>::new(path.to_string_lossy());
    let pool = Pool::builder()
        .max_size(DEFAULT_POOL_SIZE)
        .connection_customizer(Box::new(ConnectionOptions {
            busy_timeout: Duration::from_secs(5),
        }))
        .build(manager)?;

    tracing::debug!(path = %path.display(), "Opened SQLite pool");
    Ok(pool)
}

/// Apply pending migrations, then try to build the search index.
///
/// Returns whether the full-text index is usable.
pub fn prepare_schema(conn: &mut SqliteConnection) -> DatabaseResult<bool> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Migration(e.to_string())))?;
    if !applied.is_empty() {
        tracing::info!(count = applied.len(), "Applied database migrations");
    }

    Ok(search::ensure_search_index(conn))
}
