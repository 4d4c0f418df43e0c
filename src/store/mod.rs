//! Embedded SQL store with full-text search. One writer connection, N
//! reader connections.

pub mod migrations;
pub mod schema;

use crate::error::{KotaError, Result};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub read_only: bool,
    pub skip_schema_init: bool,
    pub busy_timeout_ms: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            read_only: false,
            skip_schema_init: false,
            busy_timeout_ms: 30_000,
        }
    }
}

/// A single read or write connection, pre-configured with the store's
/// pragmas (WAL, foreign keys, busy timeout, NORMAL sync).
fn open_connection(path: &Path, busy_timeout_ms: u32, read_only: bool) -> Result<Connection> {
    let conn = if read_only {
        Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(KotaError::from)?
    } else {
        Connection::open(path).map_err(KotaError::from)?
    };

    conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms as u64))
        .map_err(KotaError::from)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(KotaError::from)?;

    Ok(conn)
}

pub struct Store {
    path: PathBuf,
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_cursor: AtomicUsize,
}

impl Store {
    /// Open (or create) the store at `path`. Enables WAL, foreign keys, a
    /// busy timeout, NORMAL synchronous mode, and, unless `read_only` or
    /// `skip_schema_init` is set, runs pending migrations.
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer = open_connection(&path, options.busy_timeout_ms, options.read_only)?;

        if !options.read_only && !options.skip_schema_init {
            migrations::run_migrations(&writer).map_err(|e| {
                if let KotaError::SchemaDrift(msg) = &e {
                    warn!(%msg, "schema_drift");
                }
                e
            })?;
        }

        let reader_count = num_cpus::get().max(1).min(8);
        let mut readers = Vec::with_capacity(reader_count);
        for _ in 0..reader_count {
            readers.push(Mutex::new(open_connection(
                &path,
                options.busy_timeout_ms,
                true,
            )?));
        }

        info!(db_path = %path.display(), readers = reader_count, "store opened");

        Ok(Store {
            path,
            writer: Mutex::new(writer),
            readers,
            reader_cursor: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_reader(&self) -> &Mutex<Connection> {
        let idx = self.reader_cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        &self.readers[idx]
    }

    /// Run `f` against a pooled reader connection. No write lock is taken.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.next_reader().lock();
        f(&conn)
    }

    /// Run `f` inside a single serialized write transaction (`BEGIN
    /// DEFERRED`). Concurrent readers see either the pre- or
    /// post-transaction state.
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.writer.lock();
        conn.execute_batch("BEGIN DEFERRED").map_err(KotaError::from)?;
        match f(&conn) {
            Ok(value) => {
                conn.execute_batch("COMMIT").map_err(KotaError::from)?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// As `transaction`, but acquires the write lock eagerly (`BEGIN
    /// IMMEDIATE`). Used when contention is expected, e.g. rate-counter
    /// increments.
    pub fn immediate_transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.writer.lock();
        conn.execute_batch("BEGIN IMMEDIATE").map_err(KotaError::from)?;
        match f(&conn) {
            Ok(value) => {
                conn.execute_batch("COMMIT").map_err(KotaError::from)?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Direct write access outside an explicit transaction wrapper (used by
    /// callers that manage their own multi-statement transaction, e.g. the
    /// Indexer's step-9 commit).
    pub fn writer(&self) -> parking_lot::MutexGuard<'_, Connection> {
        self.writer.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_runs_migrations_once() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = Store::open(&db_path, StoreOptions::default()).unwrap();
        let count: i64 = store
            .read(|c| {
                c.query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
                    .map_err(Into::into)
            })
            .unwrap();
        assert_eq!(count as usize, schema::MIGRATIONS.len());
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = Store::open(&db_path, StoreOptions::default()).unwrap();

        let result: Result<()> = store.transaction(|conn| {
            conn.execute(
                "INSERT INTO repositories (id, full_name, default_ref) VALUES ('r1','o/n','main')",
                [],
            )?;
            Err(KotaError::Internal("boom".into()))
        });
        assert!(result.is_err());

        let count: i64 = store
            .read(|c| {
                c.query_row("SELECT COUNT(*) FROM repositories", [], |r| r.get(0))
                    .map_err(Into::into)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
