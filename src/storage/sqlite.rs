//! SQLite-backed crawl store
//!
//! A crawl snapshot is a single SQLite file holding one table:
//!
//! ```text
//! CREATE TABLE entries (
//!     key   BLOB PRIMARY KEY NOT NULL,   -- "<domain> <uri> <crawl>"
//!     value BLOB NOT NULL                -- JSON observation
//! ) WITHOUT ROWID
//! ```
//!
//! SQLite compares BLOBs with `memcmp`, so the primary key B-tree gives the
//! byte-lexicographic order the query engine relies on, and a `key >= ?`
//! range read is a seek followed by an ordered walk. Keys must be stored
//! as BLOBs: TEXT keys sort in a separate class and are invisible to seeks.
//!
//! The server opens stores read-only. Each scan borrows a connection from a
//! small idle pool, opening a new one when the pool is empty.

use crate::storage::error::{display_location, StorageError, StorageResult};
use crate::storage::store::{OrderedStore, ScanControl};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Table holding the entries of a snapshot
const TABLE: &str = "entries";

/// Connections kept open between scans
const MAX_IDLE_CONNECTIONS: usize = 8;

/// Read-only crawl store in a single SQLite file
pub struct SqliteStore {
    path: PathBuf,
    location: String,
    idle: Mutex<Vec<Connection>>,
}

impl SqliteStore {
    /// Open an existing store read-only
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let location = display_location(&path);

        if !path.is_file() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no store file at {}", location),
            )));
        }

        let conn = Self::connect(&path)?;

        let tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![TABLE],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(StorageError::InvalidStore {
                location,
                reason: format!("missing `{}` table", TABLE),
            });
        }

        Ok(Self {
            path,
            location,
            idle: Mutex::new(vec![conn]),
        })
    }

    /// Write a new store from (key, value) pairs and open it read-only
    ///
    /// Index-build helper: the server never calls this. Existing keys are
    /// overwritten.
    pub fn create<K, V>(
        path: impl AsRef<Path>,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> StorageResult<Self>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                key BLOB PRIMARY KEY NOT NULL,
                value BLOB NOT NULL
            ) WITHOUT ROWID",
            TABLE
        ))?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
                TABLE
            ))?;
            for (key, value) in entries {
                stmt.execute(params![key.as_ref(), value.as_ref()])?;
            }
        }
        tx.commit()?;
        drop(conn);

        Self::open(path)
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(path: &Path) -> StorageResult<Connection> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA query_only = ON;
            PRAGMA cache_size = 10000;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        Ok(conn)
    }

    /// Run `f` on a pooled connection
    ///
    /// Connections that saw an error are dropped rather than pooled.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let pooled = match self.idle.lock() {
            Ok(mut idle) => idle.pop(),
            Err(_) => None,
        };

        let conn = match pooled {
            Some(conn) => conn,
            None => Self::connect(&self.path)?,
        };

        let result = f(&conn);

        if result.is_ok() {
            if let Ok(mut idle) = self.idle.lock() {
                if idle.len() < MAX_IDLE_CONNECTIONS {
                    idle.push(conn);
                }
            }
        }

        result
    }

    fn boundary_key(&self, order: &str) -> StorageResult<Option<Vec<u8>>> {
        let sql = format!("SELECT key FROM {} ORDER BY key {} LIMIT 1", TABLE, order);
        self.with_connection(|conn| {
            let key = conn
                .query_row(&sql, [], |row| row.get::<_, Vec<u8>>(0))
                .optional()?;
            Ok(key)
        })
    }
}

impl OrderedStore for SqliteStore {
    fn location(&self) -> &str {
        &self.location
    }

    fn first_key(&self) -> StorageResult<Option<Vec<u8>>> {
        self.boundary_key("ASC")
    }

    fn last_key(&self) -> StorageResult<Option<Vec<u8>>> {
        self.boundary_key("DESC")
    }

    fn scan_from(
        &self,
        start: &[u8],
        visitor: &mut dyn FnMut(&[u8], &[u8]) -> ScanControl,
    ) -> StorageResult<()> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT key, value FROM {} WHERE key >= ?1 ORDER BY key ASC",
                TABLE
            ))?;
            let mut rows = stmt.query(params![start])?;

            while let Some(row) = rows.next()? {
                let key: Vec<u8> = row.get(0)?;
                let value: Vec<u8> = row.get(1)?;
                if visitor(&key, &value) == ScanControl::Stop {
                    break;
                }
            }

            Ok(())
        })
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("location", &self.location)
            .finish()
    }
}
