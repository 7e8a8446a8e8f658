pub mod error;
pub mod lifecycle;
pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::anyhow;
use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

pub use error::{Error, Result};
pub use lifecycle::FanOut;

const READER_POOL_SIZE: usize = 4;

/// Upper bound on how long a connection waits for a competing writer.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One writer connection plus a small pool of read-only connections.
///
/// Every mutation goes through the writer, so units of work against the same
/// prayer request are serialized. Readers see the last committed snapshot
/// (WAL) and never wait on the writer.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Run a read-only query on one of the reader connections.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| anyhow!("Reader lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Run `f` inside an IMMEDIATE transaction on the writer.
    ///
    /// The write lock is taken before `f` reads anything, so the rows it
    /// inspects cannot change until commit. Returning `Err` from `f` rolls the
    /// whole transaction back.
    pub fn unit_of_work<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| anyhow!("Writer lock poisoned: {}", e))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Database;
    use crate::models::UserRow;
    use tempfile::TempDir;

    /// A database in a scratch directory that lives as long as the value.
    pub struct TestDb {
        pub db: Database,
        _dir: TempDir,
    }

    impl std::ops::Deref for TestDb {
        type Target = Database;

        fn deref(&self) -> &Database {
            &self.db
        }
    }

    pub fn open() -> TestDb {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("whisper.db")).unwrap();
        TestDb { db, _dir: dir }
    }

    pub fn user(db: &Database, email: &str, volunteer: bool) -> UserRow {
        let user = db.create_user(email, "not-a-real-hash").unwrap();
        if volunteer {
            db.set_volunteered_to_pray(&user.id, true).unwrap()
        } else {
            user
        }
    }
}
