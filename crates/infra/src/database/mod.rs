//! SQLite-backed persistence for event snapshots.

pub mod snapshot_repository;

use std::path::Path;

use cadence_domain::Result;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub use snapshot_repository::SqliteSnapshotRepository;

use crate::errors::InfraError;

/// Connection pool shared by the repositories in this module.
pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Open (or create) the snapshot database at `path` and build a pool for it.
///
/// WAL mode and foreign keys are applied to every connection the pool hands
/// out.
pub fn open_pool(path: &Path) -> Result<SqlitePool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    });
    let pool = Pool::builder().build(manager).map_err(InfraError::from)?;
    Ok(pool)
}
