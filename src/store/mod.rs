/*!
 * Translation unit store.
 *
 * `Store` is the engine shared by every backend: it validates input, assigns
 * ids and positions, keeps the progress counters and the tag table, renders
 * units for the editor and serializes the corpus. Corpus-wide algorithms are
 * in `batch`, streaming ingestion in `crate::ingest`.
 */

pub mod backend;
pub mod batch;
pub mod display;
pub mod memory;
pub mod progress;
pub mod query;
pub mod sqlite;

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::app_config::StoreConfig;
use crate::errors::{Result, TmxError};
use crate::language_utils;
use crate::model::{ALL_LANGUAGES, Header, Note, Property, TranslationUnit, TranslationUnitVariant};
use crate::xml::TmxWriter;

pub use backend::Backend;
pub use display::{TagTable, UnitView};
pub use memory::MemoryBackend;
pub use progress::{Progress, ProgressSnapshot};
pub use query::{Order, Selection, TextFilter, TextMatcher, UnitQuery};
pub use sqlite::SqliteBackend;

/// Per-language figures reported by `Store::statistics`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LanguageStatistics {
    pub language: String,
    /// Units with a non-blank variant in this language
    pub variants: usize,
    pub words: usize,
}

/// Corpus summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub units: usize,
    pub languages: Vec<LanguageStatistics>,
}

/// Translation unit store over a storage backend
pub struct Store<B: Backend> {
    backend: B,
    config: StoreConfig,
    progress: Arc<Progress>,
    tags: Mutex<TagTable>,
    next_position: i64,
    /// Ids of deleted units, never handed out again
    retired: HashSet<String>,
}

impl Store<SqliteBackend> {
    /// Store over a fresh disposable SQLite database
    pub fn open_sqlite(config: &StoreConfig) -> Result<Self> {
        let backend = SqliteBackend::open(config.work_dir.as_deref())?;
        info!("Opened store at {:?}", backend.database_path());
        Self::new(backend, config.clone())
    }
}

impl Store<MemoryBackend> {
    /// Store kept entirely in memory
    pub fn in_memory(config: &StoreConfig) -> Result<Self> {
        Self::new(MemoryBackend::new(), config.clone())
    }
}

impl<B: Backend> Store<B> {
    pub fn new(backend: B, config: StoreConfig) -> Result<Self> {
        let next_position = backend.last_position()? + 1;
        debug!("Store over {} backend, next position {}", backend.name(), next_position);
        Ok(Self {
            backend,
            config,
            progress: Arc::new(Progress::new()),
            tags: Mutex::new(TagTable::new()),
            next_position,
            retired: HashSet::new(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Counters shared with pollers
    pub fn progress(&self) -> Arc<Progress> {
        Arc::clone(&self.progress)
    }

    pub fn count(&self) -> usize {
        self.progress.count()
    }

    pub fn processed(&self) -> usize {
        self.progress.processed()
    }

    pub fn saved(&self) -> usize {
        self.progress.saved()
    }

    pub fn discarded(&self) -> usize {
        self.progress.discarded()
    }

    pub fn exported(&self) -> usize {
        self.progress.exported()
    }

    /// Refuse every further write
    pub fn mark_closing(&self) {
        self.progress.mark_closing();
    }

    /// Fail fast once the store is closing
    pub(crate) fn check_writable(&self) -> Result<()> {
        if self.progress.is_closing() {
            Err(TmxError::Closing)
        } else {
            Ok(())
        }
    }

    /// Run `op` as one transaction, rolling back on error
    pub(crate) fn atomically<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.backend.begin()?;
        match op(self) {
            Ok(value) => {
                self.backend.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.backend.rollback() {
                    warn!("Rollback failed after {}: {}", e, rollback);
                }
                Err(e)
            }
        }
    }

    pub fn languages(&self) -> Vec<String> {
        self.backend.languages()
    }

    /// Registered language, or `UnknownLanguage`
    pub(crate) fn require_language(&self, lang: &str) -> Result<()> {
        if self.backend.languages().iter().any(|l| l == lang) {
            Ok(())
        } else {
            Err(TmxError::UnknownLanguage(lang.to_string()))
        }
    }

    pub fn unit_count(&self) -> Result<usize> {
        self.backend.unit_count()
    }

    pub fn header(&self) -> Result<Header> {
        self.backend.header()
    }

    pub fn set_header(&mut self, header: &Header) -> Result<()> {
        self.check_writable()?;
        self.backend.set_header(header)
    }

    /// Set `srclang`; accepts a registered language or `*all*`
    pub fn set_source_language(&mut self, lang: &str) -> Result<()> {
        self.check_writable()?;
        if lang != ALL_LANGUAGES {
            self.require_language(lang)?;
        }
        let mut header = self.backend.header()?;
        header.set_srclang(lang);
        self.backend.set_header(&header)
    }

    fn allocate_id(&self, requested: &str) -> Result<String> {
        let requested = requested.trim();
        if !requested.is_empty()
            && !self.retired.contains(requested)
            && !self.backend.contains_unit(requested)?
        {
            return Ok(requested.to_string());
        }
        if !requested.is_empty() {
            debug!("Unit id {:?} already used, generating a new one", requested);
        }
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.backend.contains_unit(&id)? {
                return Ok(id);
            }
        }
    }

    /// Persist a unit at the end of document order.
    ///
    /// Variants with an invalid language code are dropped. A unit left
    /// without variants is discarded and counted unless `allow_empty` is set.
    /// Returns the id the unit was stored under.
    pub fn store_unit(&mut self, mut unit: TranslationUnit, allow_empty: bool) -> Result<Option<String>> {
        self.check_writable()?;
        unit.variants.retain(|lang, variant| {
            let valid = language_utils::is_valid_language_code(lang);
            if !valid {
                warn!("Dropping variant with invalid language {:?}", lang);
            }
            variant.lang = lang.clone();
            valid
        });
        if unit.variants.is_empty() && !allow_empty {
            self.progress.add_discarded(1);
            return Ok(None);
        }
        unit.id = self.allocate_id(&unit.id)?;
        unit.position = self.next_position;
        self.backend.insert_unit(&unit)?;
        self.next_position += 1;
        self.progress.add_count(1);
        Ok(Some(unit.id))
    }

    /// Append a new unit without variants and return its id
    pub fn insert_unit(&mut self) -> Result<String> {
        let id = self.atomically(|store| store.store_unit(TranslationUnit::new(""), true))?;
        id.ok_or_else(|| TmxError::Schema("empty unit was not stored".to_string()))
    }

    /// One unit with its variants
    pub fn unit(&self, id: &str) -> Result<TranslationUnit> {
        self.backend
            .load_unit(id)?
            .ok_or_else(|| TmxError::UnknownUnit(id.to_string()))
    }

    /// Fail with `UnknownUnit` unless the id is stored
    pub fn ensure_unit(&self, id: &str) -> Result<()> {
        if self.backend.contains_unit(id)? {
            Ok(())
        } else {
            Err(TmxError::UnknownUnit(id.to_string()))
        }
    }

    /// Validate a query against the current languages
    pub fn selection(&self, query: &UnitQuery) -> Result<Selection> {
        let languages = self.backend.languages();
        let known = |lang: &str| -> Result<String> {
            if languages.iter().any(|l| l == lang) {
                Ok(lang.to_string())
            } else {
                Err(TmxError::UnknownLanguage(lang.to_string()))
            }
        };

        let untranslated_source = if query.filter_untranslated {
            Some(known(&query.filter_src_language)?)
        } else {
            None
        };
        let filter = if query.filter_text.is_empty() {
            None
        } else {
            Some(TextFilter {
                language: known(&query.filter_language)?,
                matcher: TextMatcher::new(&query.filter_text, query.case_sensitive, query.regexp)?,
            })
        };
        let order = if query.sort_language.is_empty() {
            Order::Document {
                ascending: query.ascending,
            }
        } else {
            Order::Language {
                language: known(&query.sort_language)?,
                ascending: query.ascending,
            }
        };

        Ok(Selection {
            untranslated_source,
            filter,
            order,
            offset: query.start,
            limit: Some(query.count),
        })
    }

    /// Page of rendered units, numbered from `start + 1`
    pub fn get_units(&self, query: &UnitQuery) -> Result<Vec<UnitView>> {
        let selection = self.selection(query)?;
        let units = self.backend.select(&selection)?;
        let mut tags = self.tags.lock();
        Ok(units
            .iter()
            .enumerate()
            .map(|(index, unit)| {
                UnitView::build(query.start + index + 1, unit, &mut tags, selection.filter.as_ref())
            })
            .collect())
    }

    /// Size of the filtered result set
    pub fn count_units(&self, query: &UnitQuery) -> Result<usize> {
        let selection = self.selection(query)?;
        self.backend.count(&selection)
    }

    /// Replace a variant's content from edited text and return its pure text.
    ///
    /// An empty value removes the variant.
    pub fn save_data(&mut self, id: &str, lang: &str, value: &str) -> Result<String> {
        self.check_writable()?;
        let lang = language_utils::validate_language_code(lang)?;
        let unit = self.unit(id)?;
        let segment = display::resolve(value, &self.tags.lock())?;

        if segment.is_empty() {
            self.backend.put_variant(id, &lang, None)?;
            return Ok(String::new());
        }

        let mut variant = unit
            .variants
            .get(&lang)
            .cloned()
            .unwrap_or_else(|| TranslationUnitVariant::new(lang.clone(), segment.clone()));
        variant.segment = segment;
        let pure = variant.pure_text();
        self.backend.put_variant(id, &lang, Some(&variant))?;
        Ok(pure)
    }

    /// Remove units with all their variants; returns how many existed
    pub fn delete(&mut self, ids: &[String]) -> Result<usize> {
        self.check_writable()?;
        self.atomically(|store| {
            let mut removed = 0;
            for id in ids {
                if store.remove_unit(id)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    pub(crate) fn remove_unit(&mut self, id: &str) -> Result<bool> {
        let removed = self.backend.delete_unit(id)?;
        if removed {
            self.retired.insert(id.to_string());
        }
        Ok(removed)
    }

    /// Replace matches in the text runs of every `lang` variant.
    ///
    /// Inline tags are left untouched. Returns the number of variants changed.
    pub fn replace_text(&mut self, search: &str, replace: &str, lang: &str, regexp: bool) -> Result<usize> {
        self.check_writable()?;
        self.require_language(lang)?;
        self.progress.reset();
        let matcher = TextMatcher::new(search, true, regexp)?;
        let ids = self
            .backend
            .select_ids(&Selection::matching(lang, matcher.clone()))?;
        info!("Replacing text in {} candidate units", ids.len());

        self.atomically(|store| {
            let mut changed = 0;
            for id in &ids {
                store.check_writable()?;
                let unit = store.unit(id)?;
                if let Some(mut variant) = unit.variants.get(lang).cloned() {
                    let rewritten = variant
                        .segment
                        .rewrite_text(&mut |text: &str| matcher.replace_all(text, replace));
                    if rewritten {
                        let updated = if variant.segment.is_empty() {
                            None
                        } else {
                            Some(&variant)
                        };
                        store.backend.put_variant(id, lang, updated)?;
                        changed += 1;
                    }
                }
                store.progress.add_processed(1);
            }
            Ok(changed)
        })
    }

    /// Replace a unit's attributes, properties and notes
    pub fn set_unit_metadata(
        &mut self,
        id: &str,
        attributes: Vec<(String, String)>,
        props: Vec<Property>,
        notes: Vec<Note>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut unit = self.unit(id)?.shell();
        unit.attributes = attributes.into_iter().filter(|(k, _)| k != "tuid").collect();
        unit.props = props;
        unit.notes = notes;
        self.backend.update_shell(&unit)
    }

    /// Replace a variant's attributes, properties and notes
    pub fn set_variant_metadata(
        &mut self,
        id: &str,
        lang: &str,
        attributes: Vec<(String, String)>,
        props: Vec<Property>,
        notes: Vec<Note>,
    ) -> Result<()> {
        self.check_writable()?;
        let unit = self.unit(id)?;
        let mut variant = unit
            .variants
            .get(lang)
            .cloned()
            .ok_or_else(|| TmxError::UnknownLanguage(lang.to_string()))?;
        variant.attributes = attributes
            .into_iter()
            .filter(|(k, _)| k != "xml:lang" && k != "lang")
            .collect();
        variant.props = props;
        variant.notes = notes;
        self.backend.put_variant(id, lang, Some(&variant))
    }

    /// Visit every unit matching `selection`, loading one chunk at a time
    pub(crate) fn for_each_unit<F>(&self, selection: &Selection, mut visit: F) -> Result<()>
    where
        F: FnMut(&TranslationUnit) -> Result<()>,
    {
        let chunk = self.config.commit_chunk.max(1);
        let mut page = selection.clone();
        page.limit = Some(chunk);
        loop {
            let units = self.backend.select(&page)?;
            for unit in &units {
                visit(unit)?;
            }
            if units.len() < chunk {
                return Ok(());
            }
            page.offset += chunk;
        }
    }

    /// Unit count plus variant and word counts per language
    pub fn statistics(&self) -> Result<Statistics> {
        let mut languages: BTreeMap<String, LanguageStatistics> = self
            .backend
            .languages()
            .into_iter()
            .map(|lang| {
                (
                    lang.clone(),
                    LanguageStatistics {
                        language: lang,
                        ..Default::default()
                    },
                )
            })
            .collect();
        let mut units = 0;
        self.for_each_unit(&Selection::all(), |unit| {
            units += 1;
            for (lang, variant) in &unit.variants {
                if variant.is_blank() {
                    continue;
                }
                if let Some(entry) = languages.get_mut(lang) {
                    entry.variants += 1;
                    entry.words += language_utils::word_count(&variant.pure_text());
                }
            }
            Ok(())
        })?;
        Ok(Statistics {
            units,
            languages: languages.into_values().collect(),
        })
    }

    /// Serialize the header and every unit with variants as TMX
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        self.progress.reset();
        let written = self.write_selection(path.as_ref(), &Selection::all(), |p| p.add_saved(1))?;
        info!("Saved {} units to {:?}", written, path.as_ref());
        Ok(written)
    }

    /// Serialize every unit matching `query`, ignoring its pagination
    pub fn export_file<P: AsRef<Path>>(&self, path: P, query: &UnitQuery) -> Result<usize> {
        let mut selection = self.selection(query)?;
        selection.offset = 0;
        selection.limit = None;
        self.progress.reset();
        let written = self.write_selection(path.as_ref(), &selection, |p| p.add_exported(1))?;
        info!("Exported {} units to {:?}", written, path.as_ref());
        Ok(written)
    }

    fn write_selection(
        &self,
        path: &Path,
        selection: &Selection,
        tally: impl Fn(&Progress),
    ) -> Result<usize> {
        let header = self.backend.header()?;
        let mut writer = TmxWriter::create(path, self.config.indentation)?;
        writer.begin(&header)?;
        self.for_each_unit(selection, |unit| {
            if writer.write_unit(unit)? {
                tally(&self.progress);
            }
            Ok(())
        })?;
        let written = writer.units_written();
        writer.finish()?;
        Ok(written)
    }
}
