/*!
 * In-memory backend.
 *
 * Mirrors the SQLite backend's semantics (including NULL-first ordering of
 * absent variants) so both can run the same conformance suite.
 */

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::errors::{Result, TmxError};
use crate::language_utils;
use crate::model::{Header, TranslationUnit, TranslationUnitVariant};

use super::backend::Backend;
use super::query::{Order, Selection};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    header: Option<Header>,
    languages: BTreeSet<String>,
    units: HashMap<String, TranslationUnit>,
    /// position -> id
    order: BTreeMap<i64, String>,
}

/// Backend keeping every unit in a hash map
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: MemoryState,
    snapshot: Option<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn require_language(&self, lang: &str) -> Result<()> {
        if self.state.languages.contains(lang) {
            Ok(())
        } else {
            Err(TmxError::UnknownLanguage(lang.to_string()))
        }
    }

    fn unit_mut(&mut self, id: &str) -> Result<&mut TranslationUnit> {
        self.state
            .units
            .get_mut(id)
            .ok_or_else(|| TmxError::UnknownUnit(id.to_string()))
    }

    /// Matching units in selection order, before pagination
    fn matching(&self, selection: &Selection) -> Result<Vec<&TranslationUnit>> {
        if let Some(source) = &selection.untranslated_source {
            self.require_language(source)?;
        }
        if let Some(filter) = &selection.filter {
            self.require_language(&filter.language)?;
        }
        if let Order::Language { language, .. } = &selection.order {
            self.require_language(language)?;
        }

        let mut units: Vec<&TranslationUnit> = self
            .state
            .order
            .values()
            .filter_map(|id| self.state.units.get(id))
            .filter(|unit| match &selection.untranslated_source {
                Some(source) => unit.is_untranslated(source),
                None => true,
            })
            .filter(|unit| match &selection.filter {
                Some(filter) => unit
                    .variant(&filter.language)
                    .is_some_and(|v| filter.matcher.is_match(&v.pure_text())),
                None => true,
            })
            .collect();

        match &selection.order {
            Order::Document { ascending } => {
                if !ascending {
                    units.reverse();
                }
            }
            Order::Language { language, ascending } => {
                let mut keyed: Vec<(Option<String>, i64, &TranslationUnit)> = units
                    .into_iter()
                    .map(|unit| (unit.variant(language).map(|v| v.pure_text()), unit.position, unit))
                    .collect();
                keyed.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
                if !ascending {
                    keyed.reverse();
                }
                units = keyed.into_iter().map(|(_, _, unit)| unit).collect();
            }
        }
        Ok(units)
    }

    fn page<'a>(&self, units: Vec<&'a TranslationUnit>, selection: &Selection) -> Vec<&'a TranslationUnit> {
        let iter = units.into_iter().skip(selection.offset);
        match selection.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn languages(&self) -> Vec<String> {
        self.state.languages.iter().cloned().collect()
    }

    fn add_language(&mut self, lang: &str) -> Result<bool> {
        if self.state.languages.contains(lang) {
            return Ok(false);
        }
        let lang = language_utils::validate_language_code(lang)?;
        Ok(self.state.languages.insert(lang))
    }

    fn remove_language(&mut self, lang: &str) -> Result<usize> {
        self.require_language(lang)?;
        self.state.languages.remove(lang);
        let mut affected = 0;
        for unit in self.state.units.values_mut() {
            if unit.variants.remove(lang).is_some() {
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn rename_language(&mut self, old: &str, new: &str) -> Result<usize> {
        self.require_language(old)?;
        if self.state.languages.contains(new) {
            return Err(TmxError::Schema(format!("language {} already exists", new)));
        }
        let new = language_utils::validate_language_code(new)?;
        self.state.languages.remove(old);
        self.state.languages.insert(new.clone());
        let mut moved = 0;
        for unit in self.state.units.values_mut() {
            if let Some(mut variant) = unit.variants.remove(old) {
                variant.lang = new.clone();
                unit.variants.insert(new.clone(), variant);
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn header(&self) -> Result<Header> {
        Ok(self.state.header.clone().unwrap_or_default())
    }

    fn set_header(&mut self, header: &Header) -> Result<()> {
        self.state.header = Some(header.clone());
        Ok(())
    }

    fn insert_unit(&mut self, unit: &TranslationUnit) -> Result<()> {
        if self.state.units.contains_key(&unit.id) {
            return Err(TmxError::Schema(format!("duplicate unit id {}", unit.id)));
        }
        if self.state.order.contains_key(&unit.position) {
            return Err(TmxError::Schema(format!("duplicate position {}", unit.position)));
        }
        for lang in unit.variants.keys() {
            self.add_language(lang)?;
        }
        self.state.order.insert(unit.position, unit.id.clone());
        self.state.units.insert(unit.id.clone(), unit.clone());
        Ok(())
    }

    fn contains_unit(&self, id: &str) -> Result<bool> {
        Ok(self.state.units.contains_key(id))
    }

    fn load_unit(&self, id: &str) -> Result<Option<TranslationUnit>> {
        Ok(self.state.units.get(id).cloned())
    }

    fn update_shell(&mut self, unit: &TranslationUnit) -> Result<()> {
        let stored = self.unit_mut(&unit.id)?;
        stored.attributes = unit.attributes.clone();
        stored.props = unit.props.clone();
        stored.notes = unit.notes.clone();
        Ok(())
    }

    fn put_variant(
        &mut self,
        id: &str,
        lang: &str,
        variant: Option<&TranslationUnitVariant>,
    ) -> Result<()> {
        if !self.state.units.contains_key(id) {
            return Err(TmxError::UnknownUnit(id.to_string()));
        }
        if variant.is_some() {
            self.add_language(lang)?;
        }
        let unit = self.unit_mut(id)?;
        match variant {
            Some(variant) => {
                let mut variant = variant.clone();
                variant.lang = lang.to_string();
                unit.variants.insert(lang.to_string(), variant);
            }
            None => {
                unit.variants.remove(lang);
            }
        }
        Ok(())
    }

    fn delete_unit(&mut self, id: &str) -> Result<bool> {
        match self.state.units.remove(id) {
            Some(unit) => {
                self.state.order.remove(&unit.position);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn unit_count(&self) -> Result<usize> {
        Ok(self.state.units.len())
    }

    fn last_position(&self) -> Result<i64> {
        Ok(self.state.order.keys().next_back().copied().unwrap_or(0))
    }

    fn select(&self, selection: &Selection) -> Result<Vec<TranslationUnit>> {
        let units = self.matching(selection)?;
        Ok(self.page(units, selection).into_iter().cloned().collect())
    }

    fn select_ids(&self, selection: &Selection) -> Result<Vec<String>> {
        let units = self.matching(selection)?;
        Ok(self
            .page(units, selection)
            .into_iter()
            .map(|unit| unit.id.clone())
            .collect())
    }

    fn count(&self, selection: &Selection) -> Result<usize> {
        Ok(self.matching(selection)?.len())
    }

    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.state.clone());
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if let Some(snapshot) = self.snapshot.take() {
            self.state = snapshot;
        }
        Ok(())
    }
}
