/*!
 * Storage contract implemented by every backend.
 *
 * Backends only persist and select. Validation, counters, display rendering
 * and the corpus-wide algorithms live in `Store`, so a backend stays a thin
 * mapping onto its storage engine.
 */

use crate::errors::Result;
use crate::model::{Header, TranslationUnit, TranslationUnitVariant};

use super::query::Selection;

pub trait Backend: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Registered languages, sorted
    fn languages(&self) -> Vec<String>;

    /// Register a language; false if it already exists
    fn add_language(&mut self, lang: &str) -> Result<bool>;

    /// Drop a language and every variant in it; returns the variants removed
    fn remove_language(&mut self, lang: &str) -> Result<usize>;

    /// Move every variant of `old` to `new`; `new` must not exist.
    /// Returns the variants moved.
    fn rename_language(&mut self, old: &str, new: &str) -> Result<usize>;

    fn header(&self) -> Result<Header>;

    fn set_header(&mut self, header: &Header) -> Result<()>;

    /// Persist a unit with its variants; every variant language is registered
    fn insert_unit(&mut self, unit: &TranslationUnit) -> Result<()>;

    fn contains_unit(&self, id: &str) -> Result<bool>;

    /// Unit with variants reattached
    fn load_unit(&self, id: &str) -> Result<Option<TranslationUnit>>;

    /// Replace attributes, properties and notes of a unit
    fn update_shell(&mut self, unit: &TranslationUnit) -> Result<()>;

    /// Replace or clear (`None`) one variant
    fn put_variant(
        &mut self,
        id: &str,
        lang: &str,
        variant: Option<&TranslationUnitVariant>,
    ) -> Result<()>;

    /// Remove a unit and all its variants; false if absent
    fn delete_unit(&mut self, id: &str) -> Result<bool>;

    fn unit_count(&self) -> Result<usize>;

    /// Highest position in use, 0 when empty
    fn last_position(&self) -> Result<i64>;

    /// Units matching the selection, ordered and paginated
    fn select(&self, selection: &Selection) -> Result<Vec<TranslationUnit>>;

    /// Ids matching the selection, ordered and paginated
    fn select_ids(&self, selection: &Selection) -> Result<Vec<String>>;

    /// Size of the selection ignoring offset and limit
    fn count(&self, selection: &Selection) -> Result<usize>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}
