use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;

use crate::error::FetchError;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Per-connection tuning. `journal_mode` is persistent on the file and is set
/// by the schema instead.
const CONNECTION_PRAGMAS: &str = "PRAGMA synchronous = NORMAL;
     PRAGMA busy_timeout = 5000;
     PRAGMA temp_store = MEMORY;";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

pub fn create_pool(db_path: &Path) -> Result<DbPool, FetchError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));

    // One writer per process, so a small pool is plenty.
    let pool = Pool::builder()
        .max_size(4)
        .connection_timeout(CONNECT_TIMEOUT)
        .build(manager)?;

    Ok(pool)
}

/// In-memory catalogs live on a single connection, otherwise every pooled
/// connection would see its own empty database.
pub fn create_memory_pool() -> Result<DbPool, FetchError> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));

    let pool = Pool::builder()
        .max_size(1)
        .connection_timeout(CONNECT_TIMEOUT)
        .build(manager)?;

    Ok(pool)
}
