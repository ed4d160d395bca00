/*!
 * SQLite implementation of the storage contract.
 *
 * One row per unit in `units` (id, serialized shell, position) and one row
 * per unit in `variants` with two columns per language. Every per-language
 * predicate is compiled into column references taken from the registry;
 * free text is always bound as a parameter.
 */

use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::path::Path;

use super::connection::{DatabaseConnection, DatabaseStats};
use super::schema::{SchemaRegistry, pure_column, tuv_column};
use crate::errors::{Result, TmxError};
use crate::model::{Header, TranslationUnit, TranslationUnitVariant};
use crate::store::backend::Backend;
use crate::store::query::{Order, Selection};
use crate::xml::reader::{header_from_element, parse_element, unit_from_element, variant_from_element};
use crate::xml::writer::{Layout, header_to_string, unit_to_string, variant_to_stored_string};

/// Reference backend over a disposable SQLite database
pub struct SqliteBackend {
    db: DatabaseConnection,
    registry: SchemaRegistry,
}

impl SqliteBackend {
    /// Create a backend whose database lives in a fresh temporary directory
    pub fn open(work_dir: Option<&Path>) -> Result<Self> {
        Self::with_connection(DatabaseConnection::new_temporary(work_dir)?)
    }

    /// Create a backend with an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(DatabaseConnection::new_in_memory()?)
    }

    fn with_connection(db: DatabaseConnection) -> Result<Self> {
        let registry = db.execute(SchemaRegistry::load)?;
        Ok(Self { db, registry })
    }

    /// Location of the database file
    pub fn database_path(&self) -> &Path {
        self.db.path()
    }

    pub fn stats(&self) -> Result<DatabaseStats> {
        self.db.stats()
    }

    fn ensure_language(&mut self, lang: &str) -> Result<()> {
        if self.registry.contains(lang) {
            return Ok(());
        }
        let registry = &mut self.registry;
        self.db.execute(|conn| registry.add_language(conn, lang).map(|_| ()))
    }

    /// `u.id, u.shell, u.position` followed by every `_tuv` column
    fn unit_columns(&self) -> (String, Vec<String>) {
        let mut columns = String::from("u.id, u.shell, u.position");
        let mut languages = Vec::new();
        for (code, stem) in self.registry.entries() {
            columns.push_str(", v.");
            columns.push_str(&tuv_column(stem));
            languages.push(code.to_string());
        }
        (columns, languages)
    }

    /// WHERE clause and bound values for the selection's filters
    fn where_clause(&self, selection: &Selection) -> Result<(String, Vec<String>)> {
        let mut predicates = Vec::new();
        let mut values = Vec::new();

        if let Some(source) = &selection.untranslated_source {
            self.registry.require(source)?;
            for (code, stem) in self.registry.entries() {
                if code != source {
                    predicates.push(format!("is_blank(v.{})", pure_column(stem)));
                }
            }
        }

        if let Some(filter) = &selection.filter {
            let stem = self.registry.require(&filter.language)?;
            let (predicate, value) = filter
                .matcher
                .sql_predicate(&format!("v.{}", pure_column(stem)));
            predicates.push(predicate);
            values.push(value);
        }

        if predicates.is_empty() {
            Ok((String::new(), values))
        } else {
            Ok((format!(" WHERE {}", predicates.join(" AND ")), values))
        }
    }

    fn order_clause(&self, order: &Order) -> Result<String> {
        Ok(match order {
            Order::Document { ascending } => {
                format!(" ORDER BY u.position {}", direction(*ascending))
            }
            Order::Language { language, ascending } => {
                let stem = self.registry.require(language)?;
                let dir = direction(*ascending);
                format!(" ORDER BY v.{} {dir}, u.position {dir}", pure_column(stem))
            }
        })
    }

    fn query_sql(&self, columns: &str, selection: &Selection) -> Result<(String, Vec<String>)> {
        let (filter, values) = self.where_clause(selection)?;
        let order = self.order_clause(&selection.order)?;
        let limit = selection.limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!(
            "SELECT {} FROM units u JOIN variants v ON v.id = u.id{}{} LIMIT {} OFFSET {}",
            columns, filter, order, limit, selection.offset
        );
        Ok((sql, values))
    }
}

fn direction(ascending: bool) -> &'static str {
    if ascending { "ASC" } else { "DESC" }
}

/// Rebuild a unit from `u.id, u.shell, u.position, <tuv columns...>`
fn unit_from_row(row: &Row<'_>, languages: &[String]) -> Result<TranslationUnit> {
    let id: String = row.get(0)?;
    let shell: String = row.get(1)?;
    let position: i64 = row.get(2)?;

    let (mut unit, _) = unit_from_element(parse_element(&shell)?);
    unit.id = id;
    unit.position = position;

    for (index, lang) in languages.iter().enumerate() {
        let stored: Option<String> = row.get(index + 3)?;
        if let Some(stored) = stored {
            match variant_from_element(parse_element(&stored)?, Some(lang)) {
                Some(variant) => {
                    unit.variants.insert(lang.clone(), variant);
                }
                None => warn!("Stored variant {} of unit {} is unreadable", lang, unit.id),
            }
        }
    }
    Ok(unit)
}

fn shell_to_string(unit: &TranslationUnit) -> String {
    unit_to_string(&unit.shell(), &Layout::compact())
}

fn in_transaction(conn: &Connection) -> bool {
    !conn.is_autocommit()
}

impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn languages(&self) -> Vec<String> {
        self.registry.languages()
    }

    fn add_language(&mut self, lang: &str) -> Result<bool> {
        let registry = &mut self.registry;
        self.db.execute(|conn| registry.add_language(conn, lang))
    }

    fn remove_language(&mut self, lang: &str) -> Result<usize> {
        let registry = &mut self.registry;
        self.db.execute(|conn| registry.drop_language(conn, lang))
    }

    fn rename_language(&mut self, old: &str, new: &str) -> Result<usize> {
        let registry = &mut self.registry;
        self.db.execute(|conn| registry.rename_language(conn, old, new))
    }

    fn header(&self) -> Result<Header> {
        let content: Option<String> = self.db.execute(|conn| {
            Ok(conn
                .query_row("SELECT content FROM header WHERE id = 1", [], |row| row.get(0))
                .optional()?)
        })?;
        match content {
            Some(content) => Ok(header_from_element(parse_element(&content)?)),
            None => Ok(Header::default()),
        }
    }

    fn set_header(&mut self, header: &Header) -> Result<()> {
        let content = header_to_string(header);
        self.db.execute(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO header (id, content) VALUES (1, ?1)",
                [content],
            )?;
            Ok(())
        })
    }

    fn insert_unit(&mut self, unit: &TranslationUnit) -> Result<()> {
        for lang in unit.variants.keys() {
            self.ensure_language(lang)?;
        }

        let mut columns = vec!["id".to_string()];
        let mut values = vec![unit.id.clone()];
        for (lang, variant) in &unit.variants {
            let stem = self.registry.require(lang)?;
            columns.push(pure_column(stem));
            columns.push(tuv_column(stem));
            values.push(variant.pure_text());
            values.push(variant_to_stored_string(variant));
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        let insert_variants = format!(
            "INSERT INTO variants ({}) VALUES ({})",
            columns.join(", "),
            placeholders
        );

        let shell = shell_to_string(unit);
        self.db.execute(|conn| {
            conn.execute(
                "INSERT INTO units (id, shell, position) VALUES (?1, ?2, ?3)",
                params![unit.id, shell, unit.position],
            )?;
            conn.execute(&insert_variants, params_from_iter(values.iter()))?;
            Ok(())
        })
    }

    fn contains_unit(&self, id: &str) -> Result<bool> {
        self.db.execute(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM units WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn load_unit(&self, id: &str) -> Result<Option<TranslationUnit>> {
        let (columns, languages) = self.unit_columns();
        let sql = format!(
            "SELECT {} FROM units u JOIN variants v ON v.id = u.id WHERE u.id = ?1",
            columns
        );
        self.db.execute(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => Ok(Some(unit_from_row(row, &languages)?)),
                None => Ok(None),
            }
        })
    }

    fn update_shell(&mut self, unit: &TranslationUnit) -> Result<()> {
        let shell = shell_to_string(unit);
        let changed = self.db.execute(|conn| {
            Ok(conn.execute(
                "UPDATE units SET shell = ?1 WHERE id = ?2",
                params![shell, unit.id],
            )?)
        })?;
        if changed == 0 {
            return Err(TmxError::UnknownUnit(unit.id.clone()));
        }
        Ok(())
    }

    fn put_variant(
        &mut self,
        id: &str,
        lang: &str,
        variant: Option<&TranslationUnitVariant>,
    ) -> Result<()> {
        let (pure, stored) = match variant {
            Some(variant) => {
                self.ensure_language(lang)?;
                (Some(variant.pure_text()), Some(variant_to_stored_string(variant)))
            }
            None if !self.registry.contains(lang) => return Ok(()),
            None => (None, None),
        };
        let stem = self.registry.require(lang)?;
        let sql = format!(
            "UPDATE variants SET {} = ?1, {} = ?2 WHERE id = ?3",
            pure_column(stem),
            tuv_column(stem)
        );
        let changed = self
            .db
            .execute(|conn| Ok(conn.execute(&sql, params![pure, stored, id])?))?;
        if changed == 0 {
            return Err(TmxError::UnknownUnit(id.to_string()));
        }
        Ok(())
    }

    fn delete_unit(&mut self, id: &str) -> Result<bool> {
        self.db.execute(|conn| {
            conn.execute("DELETE FROM variants WHERE id = ?1", [id])?;
            let removed = conn.execute("DELETE FROM units WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    fn unit_count(&self) -> Result<usize> {
        self.db.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM units", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    fn last_position(&self) -> Result<i64> {
        self.db.execute(|conn| {
            Ok(conn.query_row("SELECT COALESCE(MAX(position), 0) FROM units", [], |row| {
                row.get(0)
            })?)
        })
    }

    fn select(&self, selection: &Selection) -> Result<Vec<TranslationUnit>> {
        let (columns, languages) = self.unit_columns();
        let (sql, values) = self.query_sql(&columns, selection)?;
        debug!("select: {}", sql);
        self.db.execute(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(values.iter()))?;
            let mut units = Vec::new();
            while let Some(row) = rows.next()? {
                units.push(unit_from_row(row, &languages)?);
            }
            Ok(units)
        })
    }

    fn select_ids(&self, selection: &Selection) -> Result<Vec<String>> {
        let (sql, values) = self.query_sql("u.id", selection)?;
        self.db.execute(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let ids = stmt
                .query_map(params_from_iter(values.iter()), |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(ids)
        })
    }

    fn count(&self, selection: &Selection) -> Result<usize> {
        let (filter, values) = self.where_clause(selection)?;
        let sql = format!(
            "SELECT COUNT(*) FROM units u JOIN variants v ON v.id = u.id{}",
            filter
        );
        self.db.execute(|conn| {
            let count: i64 =
                conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    fn begin(&mut self) -> Result<()> {
        self.db.execute(|conn| {
            if !in_transaction(conn) {
                conn.execute_batch("BEGIN")?;
            }
            Ok(())
        })
    }

    fn commit(&mut self) -> Result<()> {
        self.db.execute(|conn| {
            if in_transaction(conn) {
                conn.execute_batch("COMMIT")?;
            }
            Ok(())
        })
    }

    fn rollback(&mut self) -> Result<()> {
        let registry = self.db.execute(|conn| {
            if in_transaction(conn) {
                conn.execute_batch("ROLLBACK")?;
            }
            SchemaRegistry::load(conn)
        })?;
        // Columns added or dropped inside the transaction are undone too
        self.registry = registry;
        Ok(())
    }
}
