/*!
 * Database connection management.
 *
 * The corpus database is a private cache: it lives in a temporary directory
 * created on open and removed when the connection is dropped. This module
 * also registers the SQL functions the dynamic queries rely on.
 */

use log::{debug, info};
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::schema;
use crate::errors::Result;

/// Database filename inside the temporary directory
const DB_FILENAME: &str = "corpus.db";

/// Prefix of the temporary directory
const DB_DIR_PREFIX: &str = "tmxstore-";

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Database connection wrapper with thread-safe access
#[derive(Clone)]
pub struct DatabaseConnection {
    /// Path to the database file
    db_path: PathBuf,
    /// Connection guarded by a mutex; declared before `dir` so it closes first
    connection: Arc<Mutex<Connection>>,
    /// Directory removed on drop
    dir: Option<Arc<TempDir>>,
}

impl DatabaseConnection {
    /// Create a fresh database in a temporary directory under `work_dir`
    /// (or the system temporary directory)
    pub fn new_temporary(work_dir: Option<&Path>) -> Result<Self> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix(DB_DIR_PREFIX);
            builder
        };
        let dir = match work_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        let db_path = dir.path().join(DB_FILENAME);

        info!("Opening corpus database at: {:?}", db_path);

        let conn = Connection::open(&db_path)?;
        Self::prepare(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
            dir: Some(Arc::new(dir)),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory corpus database");

        let conn = Connection::open_in_memory()?;
        Self::prepare(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
            dir: None,
        })
    }

    fn prepare(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
        register_functions(conn)?;
        schema::initialize_schema(conn)?;
        Ok(())
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Directory holding the database files, if on disk
    pub fn directory(&self) -> Option<&Path> {
        self.dir.as_ref().map(|d| d.path())
    }

    /// Execute a database operation with the connection
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connection.lock();
        f(&conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.execute(|conn| {
            let unit_count: i64 =
                conn.query_row("SELECT COUNT(*) FROM units", [], |row| row.get(0))?;
            let language_count: i64 =
                conn.query_row("SELECT COUNT(*) FROM languages", [], |row| row.get(0))?;

            // Get file size if not in-memory
            let file_size = if self.dir.is_some() {
                std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
            } else {
                0
            };

            Ok(DatabaseStats {
                unit_count,
                language_count,
                file_size_bytes: file_size,
            })
        })
    }
}

/// Register `regexp(pattern, text)` and `is_blank(text)`.
///
/// SQLite rewrites `x REGEXP y` into `regexp(y, x)`. The compiled pattern is
/// cached per statement through the function's auxiliary data.
fn register_functions(conn: &Connection) -> Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("regexp", 2, flags, |ctx| {
        let regex: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> std::result::Result<_, BoxError> {
            Ok(Regex::new(vr.as_str()?)?)
        })?;
        let matched = match ctx.get_raw(1) {
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|text| regex.is_match(text))
                .unwrap_or(false),
            _ => false,
        };
        Ok(matched)
    })?;

    conn.create_scalar_function("is_blank", 1, flags, |ctx| {
        let blank = match ctx.get_raw(0) {
            ValueRef::Null => true,
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|text| text.trim().is_empty())
                .unwrap_or(false),
            _ => false,
        };
        Ok(blank)
    })?;

    Ok(())
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub unit_count: i64,
    pub language_count: i64,
    /// Database file size in bytes
    pub file_size_bytes: u64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Units: {}, Languages: {}, Size: {} KB",
            self.unit_count,
            self.language_count,
            self.file_size_bytes / 1024
        )
    }
}
