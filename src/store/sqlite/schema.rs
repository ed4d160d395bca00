/*!
 * Database schema definitions and the dynamic language registry.
 *
 * Static tables hold the header, the unit shells and the language registry.
 * The `variants` table grows two columns per language (`<stem>_pure` and
 * `<stem>_tuv`); `SchemaRegistry` is the in-memory mirror of which stem
 * belongs to which language code.
 */

use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;

use crate::errors::{Result, TmxError};
use crate::language_utils;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing corpus schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version != SCHEMA_VERSION {
        // The database is recreated on every open, so a mismatch means a foreign file
        return Err(TmxError::Schema(format!(
            "unsupported schema version {} (expected {})",
            current_version, SCHEMA_VERSION
        )));
    } else {
        debug!("Corpus schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(version.unwrap_or(0))
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create the static tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS header (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            content TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS units (
            id TEXT PRIMARY KEY,
            shell TEXT NOT NULL,
            position INTEGER NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS variants (
            id TEXT PRIMARY KEY REFERENCES units(id)
        );

        CREATE TABLE IF NOT EXISTS languages (
            code TEXT PRIMARY KEY,
            column_name TEXT NOT NULL UNIQUE
        );
        "#,
    )?;
    Ok(())
}

/// Column holding the pure-text projection for a stem
pub fn pure_column(stem: &str) -> String {
    format!("{}_pure", stem)
}

/// Column holding the serialized variant for a stem
pub fn tuv_column(stem: &str) -> String {
    format!("{}_tuv", stem)
}

fn index_name(stem: &str) -> String {
    format!("idx_{}_pure", stem)
}

/// Mapping from language codes to the column stems that store them
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    columns: BTreeMap<String, String>,
}

impl SchemaRegistry {
    /// Read the registry table
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare("SELECT code, column_name FROM languages")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut columns = BTreeMap::new();
        for row in rows {
            let (code, stem) = row?;
            columns.insert(code, stem);
        }
        Ok(Self { columns })
    }

    /// Registered codes, sorted
    pub fn languages(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.columns.contains_key(code)
    }

    /// Column stem of a registered language
    pub fn column(&self, code: &str) -> Option<&str> {
        self.columns.get(code).map(String::as_str)
    }

    /// Column stem of a registered language, or `UnknownLanguage`
    pub fn require(&self, code: &str) -> Result<&str> {
        self.column(code)
            .ok_or_else(|| TmxError::UnknownLanguage(code.to_string()))
    }

    /// Iterate over `(code, stem)` pairs in code order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(c, s)| (c.as_str(), s.as_str()))
    }

    /// First stem for `code` not taken by another language
    pub fn allocate(&self, code: &str) -> String {
        let mut attempt = 0;
        loop {
            let stem = language_utils::column_name(code, attempt);
            if !self.columns.values().any(|taken| *taken == stem) {
                return stem;
            }
            attempt += 1;
        }
    }

    /// Register a language and create its columns; false if already present
    pub fn add_language(&mut self, conn: &Connection, code: &str) -> Result<bool> {
        if self.contains(code) {
            return Ok(false);
        }
        let code = language_utils::validate_language_code(code)?;
        let stem = self.allocate(&code);
        let pure = pure_column(&stem);
        conn.execute_batch(&format!(
            "ALTER TABLE variants ADD COLUMN {pure} TEXT;
             ALTER TABLE variants ADD COLUMN {tuv} TEXT;
             CREATE INDEX {index} ON variants({pure});",
            pure = pure,
            tuv = tuv_column(&stem),
            index = index_name(&stem),
        ))
        .map_err(|e| TmxError::Schema(format!("cannot add columns for {}: {}", code, e)))?;
        conn.execute(
            "INSERT INTO languages (code, column_name) VALUES (?1, ?2)",
            params![code, stem],
        )?;
        debug!("Registered language {} as {}", code, stem);
        self.columns.insert(code, stem);
        Ok(true)
    }

    /// Drop a language's columns and registry entry, returning how many units
    /// had a variant in it
    pub fn drop_language(&mut self, conn: &Connection, code: &str) -> Result<usize> {
        let stem = self.require(code)?.to_string();
        let affected: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM variants WHERE {pure} IS NOT NULL OR {tuv} IS NOT NULL",
                pure = pure_column(&stem),
                tuv = tuv_column(&stem)
            ),
            [],
            |row| row.get(0),
        )?;
        conn.execute_batch(&format!(
            "DROP INDEX IF EXISTS {index};
             ALTER TABLE variants DROP COLUMN {pure};
             ALTER TABLE variants DROP COLUMN {tuv};",
            index = index_name(&stem),
            pure = pure_column(&stem),
            tuv = tuv_column(&stem),
        ))
        .map_err(|e| TmxError::Schema(format!("cannot drop columns for {}: {}", code, e)))?;
        conn.execute("DELETE FROM languages WHERE code = ?1", [code])?;
        debug!("Dropped language {} ({}), {} variants", code, stem, affected);
        self.columns.remove(code);
        Ok(affected as usize)
    }

    /// Move a language's data to a new code; `new` must not be registered.
    ///
    /// Returns the number of variants moved.
    pub fn rename_language(&mut self, conn: &Connection, old: &str, new: &str) -> Result<usize> {
        let old_stem = self.require(old)?.to_string();
        if self.contains(new) {
            return Err(TmxError::Schema(format!("language {} already exists", new)));
        }
        self.add_language(conn, new)?;
        let new_stem = self.require(new)?.to_string();
        let moved = conn.execute(
            &format!(
                "UPDATE variants SET {np} = {op}, {nt} = {ot} WHERE {op} IS NOT NULL OR {ot} IS NOT NULL",
                np = pure_column(&new_stem),
                op = pure_column(&old_stem),
                nt = tuv_column(&new_stem),
                ot = tuv_column(&old_stem),
            ),
            [],
        )?;
        self.drop_language(conn, old)?;
        Ok(moved)
    }
}
