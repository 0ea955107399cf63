//! SQLite persistence for uploaded files.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Busy timeout for SQLite connections, in milliseconds.
const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Maximum number of pooled SQLite connections.
const POOL_MAX_SIZE: u32 = 8;

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to build the connection pool.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),

    /// Failed to run schema migrations.
    #[error("failed to run migrations: {0}")]
    Migration(#[from] rusqlite::Error),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL UNIQUE,
    stored_name TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    extracted_text TEXT,
    uploaded_at TEXT NOT NULL
);
";

/// Creates a new SQLite connection pool with WAL mode enabled and the
/// schema applied.
///
/// Use `:memory:` as `db_path` for an in-memory database (useful for
/// testing).
///
/// # Errors
///
/// Returns `PoolError` if the pool cannot be created or the schema cannot
/// be applied.
pub fn create_pool(db_path: &str) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| {
            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            // In-memory databases report "memory", which is acceptable.
            if journal_mode != "wal" && journal_mode != "memory" {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!(
                        "failed to set WAL journal mode, got: {}",
                        journal_mode
                    )),
                ));
            }
            conn.execute_batch(&format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS))
        });

    let pool = Pool::builder().max_size(POOL_MAX_SIZE).build(manager)?;

    {
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA)?;
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_pool_has_schema() {
        let pool = create_pool(":memory:").expect("pool creation should succeed");
        let conn = pool.get().expect("should get a connection");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .expect("files table should exist");
        assert_eq!(count, 0);
    }
}
