/*!
 * Corpus-wide batch algorithms.
 *
 * Each operation resets the progress counters, runs inside one transaction
 * and increments `processed` for every unit it examines. Units are walked by
 * id so deletions never disturb the iteration.
 */

use log::{debug, info, warn};
use std::collections::HashMap;

use super::backend::Backend;
use super::query::Selection;
use super::Store;
use crate::errors::Result;
use crate::language_utils;
use crate::model::{ALL_LANGUAGES, TranslationUnit};

impl<B: Backend> Store<B> {
    /// Delete units whose only non-blank variant is in `lang`
    pub fn remove_untranslated(&mut self, lang: &str) -> Result<usize> {
        self.check_writable()?;
        self.require_language(lang)?;
        self.progress.reset();
        let removed = self.atomically(|store| store.delete_untranslated(lang))?;
        info!("Removed {} untranslated units", removed);
        Ok(removed)
    }

    pub(crate) fn delete_untranslated(&mut self, lang: &str) -> Result<usize> {
        let ids = self.backend.select_ids(&Selection::untranslated(lang))?;
        let mut removed = 0;
        for id in &ids {
            self.check_writable()?;
            if self.remove_unit(id)? {
                removed += 1;
            }
            self.progress.add_processed(1);
        }
        Ok(removed)
    }

    /// Clear variants identical to the `lang` variant.
    ///
    /// A unit left without any non-blank variant besides `lang` is deleted.
    /// Returns the number of units deleted.
    pub fn remove_same_as_source(&mut self, lang: &str) -> Result<usize> {
        self.check_writable()?;
        self.require_language(lang)?;
        self.progress.reset();
        let removed = self.atomically(|store| {
            let ids = store.backend.select_ids(&Selection::all())?;
            let mut removed = 0;
            for id in &ids {
                store.check_writable()?;
                store.progress.add_processed(1);
                let mut unit = store.unit(id)?;
                let Some(source) = unit.variants.get(lang).map(|v| v.segment.clone()) else {
                    continue;
                };
                let same: Vec<String> = unit
                    .variants
                    .iter()
                    .filter(|(other, v)| other.as_str() != lang && v.segment.structurally_equal(&source))
                    .map(|(other, _)| other.clone())
                    .collect();
                if same.is_empty() {
                    continue;
                }
                for other in &same {
                    store.backend.put_variant(id, other, None)?;
                    unit.variants.remove(other);
                }
                if unit.is_untranslated(lang) {
                    store.remove_unit(id)?;
                    removed += 1;
                }
            }
            Ok(removed)
        })?;
        info!("Removed {} units identical to source", removed);
        Ok(removed)
    }

    /// Language used to bring duplicates together: the declared source
    /// language when present, otherwise the first registered one
    fn sort_language(&self) -> Result<Option<String>> {
        let languages = self.backend.languages();
        let srclang = self.backend.header()?.srclang().to_string();
        if languages.contains(&srclang) {
            return Ok(Some(srclang));
        }
        Ok(languages.into_iter().next())
    }

    /// Delete later units whose every variant equals an earlier unit's
    pub fn remove_duplicates(&mut self) -> Result<usize> {
        self.check_writable()?;
        self.progress.reset();
        let Some(lang) = self.sort_language()? else {
            return Ok(0);
        };
        let removed = self.atomically(|store| {
            // Sorted by pure text then position: duplicates are adjacent, earliest first
            let ids = store.backend.select_ids(&Selection::sorted_by(&lang))?;
            let mut run_key: Option<Option<String>> = None;
            // Kept units of the current run, bucketed by their pure text per language
            let mut run: HashMap<Vec<(String, String)>, Vec<TranslationUnit>> = HashMap::new();
            let mut removed = 0;
            for id in &ids {
                store.check_writable()?;
                store.progress.add_processed(1);
                let unit = store.unit(id)?;
                let key = unit.variant(&lang).map(|v| v.pure_text());
                if run_key.as_ref() != Some(&key) {
                    run_key = Some(key);
                    run.clear();
                }
                let bucket = run.entry(content_key(&unit)).or_default();
                if bucket.iter().any(|kept| kept.same_content(&unit)) {
                    debug!("Unit {} duplicates an earlier unit", id);
                    store.remove_unit(id)?;
                    removed += 1;
                } else {
                    bucket.push(unit);
                }
            }
            Ok(removed)
        })?;
        info!("Removed {} duplicate units", removed);
        Ok(removed)
    }

    /// Trim leading and trailing whitespace of every segment.
    ///
    /// Segments left empty are removed. Returns the number of variants changed.
    pub fn remove_spaces(&mut self) -> Result<usize> {
        self.rewrite_segments("Trimmed", |segment| segment.trim())
    }

    /// Remove inline tags from every segment, keeping translatable text
    pub fn remove_tags(&mut self) -> Result<usize> {
        self.rewrite_segments("Stripped tags from", |segment| segment.strip_tags())
    }

    fn rewrite_segments<F>(&mut self, action: &str, mut rewrite: F) -> Result<usize>
    where
        F: FnMut(&mut crate::model::Segment) -> bool,
    {
        self.check_writable()?;
        self.progress.reset();
        let changed = self.atomically(|store| {
            let ids = store.backend.select_ids(&Selection::all())?;
            let mut changed = 0;
            for id in &ids {
                store.check_writable()?;
                store.progress.add_processed(1);
                let unit = store.unit(id)?;
                for (lang, mut variant) in unit.variants {
                    if !rewrite(&mut variant.segment) {
                        continue;
                    }
                    let updated = if variant.segment.is_empty() {
                        None
                    } else {
                        Some(&variant)
                    };
                    store.backend.put_variant(id, &lang, updated)?;
                    changed += 1;
                }
            }
            Ok(changed)
        })?;
        info!("{} {} variants", action, changed);
        Ok(changed)
    }

    /// Merge units sharing an identical `lang` segment.
    ///
    /// Within each group the lowest-position unit is the representative. Every
    /// language it lacks is taken from the lowest-position member that has a
    /// non-blank variant, and cleared on that member. Units left untranslated
    /// are then removed. Returns the number of units removed.
    pub fn consolidate_units(&mut self, lang: &str) -> Result<usize> {
        self.check_writable()?;
        self.require_language(lang)?;
        self.progress.reset();
        let removed = self.atomically(|store| {
            let ids = store.backend.select_ids(&Selection::sorted_by(lang))?;
            let mut text_group: Vec<TranslationUnit> = Vec::new();
            let mut group_text: Option<String> = None;
            for id in &ids {
                store.check_writable()?;
                store.progress.add_processed(1);
                let unit = store.unit(id)?;
                let text = match unit.variant(lang) {
                    Some(source) if !source.is_blank() => source.pure_text(),
                    _ => continue,
                };
                if group_text.as_deref() != Some(text.as_str()) {
                    store.merge_group(lang, std::mem::take(&mut text_group))?;
                    group_text = Some(text);
                }
                text_group.push(unit);
            }
            store.merge_group(lang, text_group)?;
            store.delete_untranslated(lang)
        })?;
        info!("Consolidation removed {} units", removed);
        Ok(removed)
    }

    /// Merge units with equal source pure text, split by structural equality
    fn merge_group(&mut self, lang: &str, mut units: Vec<TranslationUnit>) -> Result<()> {
        if units.len() < 2 {
            return Ok(());
        }
        units.sort_by_key(|unit| unit.position);
        while !units.is_empty() {
            let source = units[0].variants[lang].segment.clone();
            let (mut same, rest): (Vec<_>, Vec<_>) = units
                .into_iter()
                .partition(|unit| unit.variants[lang].segment.structurally_equal(&source));
            units = rest;
            self.merge_members(lang, &mut same)?;
        }
        Ok(())
    }

    fn merge_members(&mut self, lang: &str, members: &mut [TranslationUnit]) -> Result<()> {
        let Some((representative, others)) = members.split_first_mut() else {
            return Ok(());
        };
        for member in others.iter_mut() {
            let movable: Vec<String> = member
                .variants
                .iter()
                .filter(|(other, v)| {
                    other.as_str() != lang
                        && !v.is_blank()
                        && representative.variant(other).is_none_or(|r| r.is_blank())
                })
                .map(|(other, _)| other.clone())
                .collect();
            for other in movable {
                if let Some(variant) = member.variants.remove(&other) {
                    self.backend.put_variant(&representative.id, &other, Some(&variant))?;
                    self.backend.put_variant(&member.id, &other, None)?;
                    representative.variants.insert(other, variant);
                }
            }
        }
        Ok(())
    }

    /// Move every variant of `old` to `new`.
    ///
    /// Returns false without changing anything when `new` already exists.
    pub fn change_language(&mut self, old: &str, new: &str) -> Result<bool> {
        self.check_writable()?;
        self.require_language(old)?;
        let new = language_utils::validate_language_code(new)?;
        if self.backend.languages().contains(&new) {
            warn!("Language {} already exists, not renaming {}", new, old);
            return Ok(false);
        }
        self.progress.reset();
        self.atomically(|store| {
            let moved = store.backend.rename_language(old, &new)?;
            store.progress.add_processed(moved);
            let mut header = store.backend.header()?;
            if header.srclang() == old {
                header.set_srclang(&new);
                store.backend.set_header(&header)?;
            }
            Ok(())
        })?;
        info!("Renamed language {} to {}", old, new);
        Ok(true)
    }

    /// Register a language with no variants; false if already present
    pub fn add_language(&mut self, lang: &str) -> Result<bool> {
        self.check_writable()?;
        let lang = language_utils::validate_language_code(lang)?;
        // No variant exists yet, so nothing is processed
        self.progress.reset();
        self.atomically(|store| store.backend.add_language(&lang))
    }

    /// Drop a language and all its variants.
    ///
    /// Units left without variants stay in the store and are skipped on save.
    pub fn remove_language(&mut self, lang: &str) -> Result<()> {
        self.check_writable()?;
        self.require_language(lang)?;
        self.progress.reset();
        self.atomically(|store| {
            let removed = store.backend.remove_language(lang)?;
            store.progress.add_processed(removed);
            let mut header = store.backend.header()?;
            if header.srclang() == lang {
                header.set_srclang(ALL_LANGUAGES);
                store.backend.set_header(&header)?;
            }
            Ok(())
        })?;
        info!("Removed language {}", lang);
        Ok(())
    }
}

/// Pure text of every variant; structurally equal units share it
fn content_key(unit: &TranslationUnit) -> Vec<(String, String)> {
    unit.variants
        .iter()
        .map(|(lang, variant)| (lang.clone(), variant.pure_text()))
        .collect()
}
