/*!
 * Behaviour every storage backend must share.
 *
 * Each check is a generic function over `Backend`; the macro at the bottom
 * instantiates the whole suite once per backend.
 */

use tmxstore::model::ALL_LANGUAGES;
use tmxstore::store::{Backend, Store};
use tmxstore::xml::{TmxEvent, TmxReader};
use tmxstore::{TmxError, TranslationUnit, UnitQuery};

use crate::common;

fn ids(views: &[tmxstore::UnitView]) -> Vec<String> {
    views.iter().map(|v| v.id.clone()).collect()
}

/// Units with a non-blank variant in `lang`
fn populated(store: &Store<impl Backend>, lang: &str) -> usize {
    store
        .statistics()
        .unwrap()
        .languages
        .into_iter()
        .find(|l| l.language == lang)
        .map(|l| l.variants)
        .unwrap_or(0)
}

fn check_ingest_counts<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "corpus.tmx", &common::sample_corpus()).unwrap();
    let report = tmxstore::load_file(&mut store, &path).unwrap();

    assert_eq!(report.units_read, 6);
    assert_eq!(report.stored, 5);
    assert_eq!(report.discarded, 1);
    assert_eq!(report.stored + report.discarded, report.units_read);
    assert_eq!(report.version.as_deref(), Some("1.4"));
    assert_eq!(store.count(), 5);
    assert_eq!(store.discarded(), 1);
    assert_eq!(store.unit_count().unwrap(), 5);
    assert_eq!(store.languages(), vec!["de", "en", "fr"]);
    assert_eq!(store.header().unwrap().srclang(), "en");
}

fn check_round_trip<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "corpus.tmx", &common::sample_corpus()).unwrap();
    tmxstore::load_file(&mut store, &input).unwrap();

    let output = dir.path().join("saved.tmx");
    assert_eq!(store.write_file(&output).unwrap(), 5);
    assert_eq!(store.saved(), 5);

    let original: Vec<TranslationUnit> = common::read_units(&input)
        .unwrap()
        .into_iter()
        .filter(|u| !u.variants.is_empty())
        .collect();
    let saved = common::read_units(&output).unwrap();
    assert_eq!(saved.len(), original.len());
    for (before, after) in original.iter().zip(&saved) {
        assert_eq!(before.id, after.id);
        assert!(before.same_content(after), "unit {} changed", before.id);
    }
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("<!DOCTYPE tmx"));
    assert!(text.contains(r#"<tmx version="1.4">"#));
}

fn check_pagination<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    let first = store.get_units(&UnitQuery::page(0, 2)).unwrap();
    let second = store.get_units(&UnitQuery::page(2, 3)).unwrap();
    let whole = store.get_units(&UnitQuery::page(0, 5)).unwrap();

    let mut joined = ids(&first);
    joined.extend(ids(&second));
    assert_eq!(joined, ids(&whole));
    assert_eq!(ids(&whole), vec!["1", "2", "3", "4", "6"]);
    let numbers: Vec<usize> = second.iter().map(|v| v.count).collect();
    assert_eq!(numbers, vec![3, 4, 5]);
    assert!(store.get_units(&UnitQuery::page(5, 10)).unwrap().is_empty());
}

fn check_case_insensitive_highlight<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    let query = UnitQuery::default().with_filter("fr", "bonjour", false, false);
    let views = store.get_units(&query).unwrap();
    assert_eq!(ids(&views), vec!["1"]);
    assert_eq!(views[0].count, 1);
    assert_eq!(views[0].variants["fr"], "<mark>Bonjour</mark>");
    assert_eq!(views[0].variants["en"], "Hello");
    assert_eq!(store.count_units(&query).unwrap(), 1);

    let strict = UnitQuery::default().with_filter("fr", "bonjour", true, false);
    assert_eq!(store.count_units(&strict).unwrap(), 0);
}

fn check_query_errors<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    let bad_regex = UnitQuery::default().with_filter("en", "(unclosed", false, true);
    let error = store.get_units(&bad_regex).unwrap_err();
    assert!(matches!(error, TmxError::InvalidRegex(_)));
    assert!(error.is_query_error());

    let unknown = UnitQuery::default().with_filter("it", "ciao", false, false);
    assert!(matches!(store.get_units(&unknown), Err(TmxError::UnknownLanguage(_))));
    let unknown_sort = UnitQuery::default().sorted_by("it", true);
    assert!(matches!(store.get_units(&unknown_sort), Err(TmxError::UnknownLanguage(_))));

    // The store stays usable after a failed query
    assert_eq!(store.get_units(&UnitQuery::default()).unwrap().len(), 5);
}

fn check_regex_filter<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    let query = UnitQuery::default().with_filter("en", "^(Hello|Bye)$", true, true);
    assert_eq!(ids(&store.get_units(&query).unwrap()), vec!["1", "6"]);
}

fn check_untranslated_filter<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    let query = UnitQuery::default().untranslated("en");
    assert_eq!(ids(&store.get_units(&query).unwrap()), vec!["4"]);
    assert_eq!(store.count_units(&query).unwrap(), 1);
}

fn check_sorting<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    let descending = store
        .get_units(&UnitQuery::default().sorted_by("en", false))
        .unwrap();
    assert_eq!(ids(&descending), vec!["4", "1", "2", "3", "6"]);

    // Units without the sort language come first, in document order
    let by_german = store
        .get_units(&UnitQuery::default().sorted_by("de", true))
        .unwrap();
    assert_eq!(ids(&by_german), vec!["1", "2", "4", "3", "6"]);

    let reversed = store
        .get_units(&UnitQuery {
            ascending: false,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(ids(&reversed), vec!["6", "4", "3", "2", "1"]);
}

fn check_edit_keeps_inline_tags<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();
    let original = store.unit("2").unwrap().variants["en"].segment.clone();

    let views = store.get_units(&UnitQuery::page(1, 1)).unwrap();
    let rendered = views[0].variants["en"].clone();
    assert!(rendered.contains("data-ref"));
    assert!(!rendered.contains("bpt"));

    let pure = store.save_data("2", "en", &rendered).unwrap();
    assert_eq!(pure, "Good morning");
    let saved = store.unit("2").unwrap().variants["en"].segment.clone();
    assert!(saved.structurally_equal(&original));

    let edited = rendered.replace("morning", "evening");
    assert_eq!(store.save_data("2", "en", &edited).unwrap(), "Good evening");
    assert!(store.unit("2").unwrap().variants["en"].segment.has_tags());

    let bogus = store.save_data("2", "en", r#"Good <tag data-ref="999"/>"#);
    assert!(matches!(bogus, Err(TmxError::UnknownTag(_))));
}

fn check_save_data_empty_then_untranslated<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    assert_eq!(store.save_data("1", "fr", "").unwrap(), "");
    assert!(store.unit("1").unwrap().variant("fr").is_none());

    assert_eq!(store.remove_untranslated("en").unwrap(), 2);
    assert!(matches!(store.ensure_unit("1"), Err(TmxError::UnknownUnit(_))));
    assert!(matches!(store.ensure_unit("4"), Err(TmxError::UnknownUnit(_))));
    assert_eq!(store.unit_count().unwrap(), 3);
}

fn check_save_data_new_language<B: Backend>(mut store: Store<B>) {
    let id = store.insert_unit().unwrap();
    assert!(store.unit(&id).unwrap().variants.is_empty());

    assert_eq!(store.save_data(&id, "it", "Ciao &amp; addio").unwrap(), "Ciao & addio");
    assert_eq!(store.languages(), vec!["it"]);
    assert!(matches!(
        store.save_data("missing", "it", "x"),
        Err(TmxError::UnknownUnit(_))
    ));
}

fn check_delete_never_reuses_ids<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    let removed = store
        .delete(&["1".to_string(), "unknown".to_string()])
        .unwrap();
    assert_eq!(removed, 1);
    assert!(store.unit("1").is_err());

    let id = store
        .store_unit(TranslationUnit::new("1").with_variant("en", "Again"), false)
        .unwrap()
        .unwrap();
    assert_ne!(id, "1");
    let last = store.get_units(&UnitQuery::page(4, 1)).unwrap();
    assert_eq!(ids(&last), vec![id]);
}

fn check_replace_text<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    assert_eq!(store.replace_text("to continue", "now", "en", false).unwrap(), 1);
    let variant = store.unit("3").unwrap().variants["en"].clone();
    assert_eq!(variant.pure_text(), "Click  now");
    assert!(variant.segment.has_tags());

    assert_eq!(store.replace_text(r"B(y)e", "B${1}e-bye", "en", true).unwrap(), 1);
    assert_eq!(store.unit("6").unwrap().pure_text("en"), "Bye-bye");

    // Case-sensitive, so nothing matches
    assert_eq!(store.replace_text("hello", "x", "en", false).unwrap(), 0);
    assert!(matches!(
        store.replace_text("(", "x", "en", true),
        Err(TmxError::InvalidRegex(_))
    ));
}

fn check_remove_duplicates_is_idempotent<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    let body = [
        common::tu("1", &[("en", "Hello"), ("fr", "Bonjour")]),
        common::tu("2", &[("en", "Hello"), ("fr", "Salut")]),
        common::tu("3", &[("en", "Hello"), ("fr", "Bonjour")]),
        common::tu("4", &[("en", "Hello <ph x=\"1\"/>"), ("fr", "Bonjour")]),
        common::tu("5", &[("en", "Hello"), ("fr", "Bonjour")]),
    ]
    .join("\n");
    common::load(&mut store, dir.path(), &common::tmx_document("en", &body)).unwrap();

    assert_eq!(store.remove_duplicates().unwrap(), 2);
    assert_eq!(ids(&store.get_units(&UnitQuery::default()).unwrap()), vec!["1", "2", "4"]);
    assert_eq!(store.remove_duplicates().unwrap(), 0);
}

fn check_consolidation_scenario<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    let body = [
        common::tu("A", &[("en", "Hello"), ("fr", "Bonjour")]),
        common::tu("B", &[("en", "Hello"), ("fr", "")]),
        common::tu("C", &[("en", "Bye"), ("fr", "Au revoir")]),
    ]
    .join("\n");
    common::load(&mut store, dir.path(), &common::tmx_document("en", &body)).unwrap();

    assert_eq!(store.consolidate_units("en").unwrap(), 1);
    let hello = UnitQuery::default().with_filter("en", "Hello", true, false);
    let views = store.get_units(&hello).unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, "A");
    assert_eq!(store.unit("A").unwrap().pure_text("fr"), "Bonjour");
    assert_eq!(store.unit_count().unwrap(), 2);
}

fn check_consolidation_never_adds_source_units<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    let body = [
        common::tu("A", &[("en", "Hello"), ("fr", "Bonjour")]),
        common::tu("B", &[("en", "Hello"), ("de", "Hallo")]),
        common::tu("C", &[("en", "World"), ("fr", "Monde")]),
        common::tu("D", &[("en", "World"), ("fr", "Terre"), ("de", "Welt")]),
        common::tu("E", &[("en", "Alone")]),
    ]
    .join("\n");
    common::load(&mut store, dir.path(), &common::tmx_document("en", &body)).unwrap();

    let before = populated(&store, "en");
    store.consolidate_units("en").unwrap();
    store.remove_untranslated("en").unwrap();
    assert!(populated(&store, "en") <= before);

    let a = store.unit("A").unwrap();
    assert_eq!(a.pure_text("de"), "Hallo");
    assert!(store.unit("B").is_err());
    // Conflicting French stays on D, which keeps its unit
    let c = store.unit("C").unwrap();
    assert_eq!(c.pure_text("fr"), "Monde");
    assert_eq!(c.pure_text("de"), "Welt");
    assert_eq!(store.unit("D").unwrap().pure_text("fr"), "Terre");
    assert!(store.unit("E").is_err());
}

fn check_remove_same_as_source<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    let body = [
        common::tu("1", &[("en", "OK"), ("fr", "OK")]),
        common::tu("2", &[("en", "OK"), ("fr", "OK"), ("de", "In Ordnung")]),
        common::tu("3", &[("en", "<ph x=\"1\"/>OK"), ("fr", "OK")]),
    ]
    .join("\n");
    common::load(&mut store, dir.path(), &common::tmx_document("en", &body)).unwrap();

    assert_eq!(store.remove_same_as_source("en").unwrap(), 1);
    assert!(store.unit("1").is_err());
    let second = store.unit("2").unwrap();
    assert!(second.variant("fr").is_none());
    assert_eq!(second.pure_text("de"), "In Ordnung");
    // Same text but different tags is not the same segment
    assert!(store.unit("3").unwrap().variant("fr").is_some());
}

fn check_spaces_and_tags<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    let body = [
        common::tu("1", &[("en", "  padded  "), ("fr", "   ")]),
        common::tu("2", &[("en", "Keep <hi>this</hi> <ph x=\"1\"/>text")]),
    ]
    .join("\n");
    common::load(&mut store, dir.path(), &common::tmx_document("en", &body)).unwrap();

    assert_eq!(store.remove_spaces().unwrap(), 2);
    let first = store.unit("1").unwrap();
    assert_eq!(first.pure_text("en"), "padded");
    assert!(first.variant("fr").is_none());

    assert_eq!(store.remove_tags().unwrap(), 1);
    let second = store.unit("2").unwrap().variants["en"].clone();
    assert!(!second.segment.has_tags());
    assert_eq!(second.pure_text(), "Keep this text");
}

fn check_language_management<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    assert!(store.change_language("fr", "fr-FR").unwrap());
    // Units 1, 2 and 6 carry French
    assert_eq!(store.processed(), 3);
    assert_eq!(store.languages(), vec!["de", "en", "fr-FR"]);
    assert_eq!(store.unit("1").unwrap().pure_text("fr-FR"), "Bonjour");

    // Renaming onto an existing language changes nothing
    assert!(!store.change_language("fr-FR", "de").unwrap());
    assert_eq!(store.unit("6").unwrap().pure_text("fr-FR"), "Au revoir");

    assert!(store.change_language("en", "en-GB").unwrap());
    assert_eq!(store.header().unwrap().srclang(), "en-GB");

    assert!(store.add_language("pt-BR").unwrap());
    assert_eq!(store.processed(), 0);
    assert!(!store.add_language("pt-BR").unwrap());
    assert!(store.languages().contains(&"pt-BR".to_string()));
    assert!(matches!(store.add_language("pt BR"), Err(TmxError::InvalidLanguage(_))));

    store.remove_language("en-GB").unwrap();
    assert_eq!(store.processed(), 5);
    assert_eq!(store.header().unwrap().srclang(), ALL_LANGUAGES);
    assert!(matches!(
        store.remove_language("en-GB"),
        Err(TmxError::UnknownLanguage(_))
    ));

    let output = dir.path().join("out.tmx");
    // Unit 4 had only English and is skipped
    assert_eq!(store.write_file(&output).unwrap(), 4);
}

fn check_case_colliding_languages<B: Backend>(mut store: Store<B>) {
    let unit = TranslationUnit::new("x")
        .with_variant("en-US", "color")
        .with_variant("EN-us", "colour");
    store.store_unit(unit, false).unwrap();

    assert_eq!(store.languages().len(), 2);
    let loaded = store.unit("x").unwrap();
    assert_eq!(loaded.pure_text("en-US"), "color");
    assert_eq!(loaded.pure_text("EN-us"), "colour");

    store.remove_language("en-US").unwrap();
    let loaded = store.unit("x").unwrap();
    assert!(loaded.variant("en-US").is_none());
    assert_eq!(loaded.pure_text("EN-us"), "colour");
}

fn check_export<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    let output = dir.path().join("export.tmx");
    let query = UnitQuery::page(0, 1).with_filter("fr", "bon", false, false);
    assert_eq!(store.export_file(&output, &query).unwrap(), 2);
    assert_eq!(store.exported(), 2);

    let exported: Vec<String> = common::read_units(&output)
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(exported, vec!["1", "2"]);
}

fn check_metadata_edits<B: Backend>(mut store: Store<B>) {
    use tmxstore::model::{Note, Property};

    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    store
        .set_unit_metadata(
            "1",
            vec![("usagecount".to_string(), "3".to_string())],
            vec![Property::new("x-domain", "greetings")],
            vec![Note::new("checked")],
        )
        .unwrap();
    store
        .set_variant_metadata("1", "fr", Vec::new(), Vec::new(), vec![Note::new("informal?")])
        .unwrap();

    let unit = store.unit("1").unwrap();
    assert_eq!(unit.props[0].value, "greetings");
    assert_eq!(unit.notes[0].text, "checked");
    assert_eq!(unit.variants["fr"].notes[0].text, "informal?");
    assert_eq!(unit.pure_text("fr"), "Bonjour");

    assert!(matches!(
        store.set_variant_metadata("4", "fr", Vec::new(), Vec::new(), Vec::new()),
        Err(TmxError::UnknownLanguage(_))
    ));
}

fn check_statistics<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    let statistics = store.statistics().unwrap();
    assert_eq!(statistics.units, 5);
    let en = statistics.languages.iter().find(|l| l.language == "en").unwrap();
    assert_eq!(en.variants, 5);
    assert_eq!(en.words, 1 + 2 + 3 + 3 + 1);
}

fn check_closing_refuses_writes<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    common::load(&mut store, dir.path(), &common::sample_corpus()).unwrap();

    store.mark_closing();
    assert!(matches!(store.save_data("1", "fr", "Salut"), Err(TmxError::Closing)));
    assert!(matches!(store.remove_duplicates(), Err(TmxError::Closing)));
    assert_eq!(store.unit("1").unwrap().pure_text("fr"), "Bonjour");
}

fn check_metadata_survives_write<B: Backend>(mut store: Store<B>) {
    let dir = common::create_temp_dir().unwrap();
    let document = r##"<?xml version="1.0" encoding="UTF-8"?>
<tmx version="1.4">
  <header srclang="en" datatype="plaintext">
    <prop type="x-client" o-encoding="base64">QWNtZQ==</prop>
    <ude name="MacRoman" base="Macintosh"><map unicode="#xF8FF" code="#xF0" ent="Apple_logo"/></ude>
  </header>
  <body>
    <tu tuid="1">
      <prop type="x-a" o-encoding="base64">YQ==</prop>
      <note o-encoding="base64">Yg==</note>
      <tuv xml:lang="en"><note xml:lang="de" o-encoding="base64">Yw==</note><seg>Hello</seg></tuv>
      <tuv xml:lang="fr"><seg>Bonjour</seg></tuv>
    </tu>
  </body>
</tmx>
"##;
    common::load(&mut store, dir.path(), document).unwrap();
    let output = dir.path().join("out.tmx");
    store.write_file(&output).unwrap();

    let mut header = None;
    let mut units = Vec::new();
    for event in TmxReader::from_path(&output).unwrap() {
        match event.unwrap() {
            TmxEvent::Header(h) => header = Some(h),
            TmxEvent::Unit(u) => units.push(u),
        }
    }
    let header = header.unwrap();
    let encoding = ("o-encoding".to_string(), "base64".to_string());
    assert_eq!(header.props[0].attributes, vec![encoding.clone()]);
    assert_eq!(header.props[0].value, "QWNtZQ==");
    assert_eq!(header.extensions.len(), 1);
    assert_eq!(header.extensions[0].name, "ude");
    assert_eq!(header.extensions[0].attribute("name"), Some("MacRoman"));

    let unit = &units[0];
    assert_eq!(unit.props[0].kind, "x-a");
    assert_eq!(unit.props[0].attributes, vec![encoding.clone()]);
    assert_eq!(unit.notes[0].attributes, vec![encoding.clone()]);
    let note = &unit.variants["en"].notes[0];
    assert_eq!(note.lang.as_deref(), Some("de"));
    assert_eq!(note.attributes, vec![encoding]);
    assert_eq!(note.text, "Yw==");
}

/// A batch that fails partway leaves the store as it was
fn check_failed_batch_rolls_back<B: Backend>(backend: B) {
    let mut store = Store::new(common::FailingDeletes::new(backend, 1), common::test_config()).unwrap();
    let dir = common::create_temp_dir().unwrap();
    let body = [
        common::tu("1", &[("en", "One")]),
        common::tu("2", &[("en", "Two")]),
        common::tu("3", &[("en", "Three")]),
        common::tu("4", &[("en", "Four"), ("fr", "Quatre")]),
    ]
    .join("\n");
    common::load(&mut store, dir.path(), &common::tmx_document("en", &body)).unwrap();

    assert!(matches!(store.remove_untranslated("en"), Err(TmxError::Schema(_))));
    assert_eq!(store.unit_count().unwrap(), 4);
    assert_eq!(store.unit("1").unwrap().pure_text("en"), "One");
    let views = store.get_units(&UnitQuery::default()).unwrap();
    assert_eq!(ids(&views), vec!["1", "2", "3", "4"]);
}

macro_rules! conformance_suite {
    ($module:ident, $open:path, $backend:path) => {
        mod $module {
            use super::*;

            #[test]
            fn test_ingest_shouldCountStoredAndDiscarded() {
                common::init_logging();
                check_ingest_counts($open());
            }

            #[test]
            fn test_writeFile_afterIngest_shouldReproduceUnits() {
                check_round_trip($open());
            }

            #[test]
            fn test_getUnits_withConsecutivePages_shouldHaveNoGaps() {
                check_pagination($open());
            }

            #[test]
            fn test_getUnits_withCaseInsensitiveFilter_shouldHighlightMatch() {
                check_case_insensitive_highlight($open());
            }

            #[test]
            fn test_getUnits_withBadInput_shouldFailQueryOnly() {
                check_query_errors($open());
            }

            #[test]
            fn test_getUnits_withRegexFilter_shouldMatchPattern() {
                check_regex_filter($open());
            }

            #[test]
            fn test_getUnits_withUntranslatedFilter_shouldKeepSourceOnlyUnits() {
                check_untranslated_filter($open());
            }

            #[test]
            fn test_getUnits_withSortLanguage_shouldOrderByPureText() {
                check_sorting($open());
            }

            #[test]
            fn test_saveData_withPlaceholders_shouldRestoreInlineTags() {
                check_edit_keeps_inline_tags($open());
            }

            #[test]
            fn test_saveData_withEmptyValue_shouldDeleteVariant() {
                check_save_data_empty_then_untranslated($open());
            }

            #[test]
            fn test_saveData_withNewLanguage_shouldRegisterIt() {
                check_save_data_new_language($open());
            }

            #[test]
            fn test_delete_shouldRetireIds() {
                check_delete_never_reuses_ids($open());
            }

            #[test]
            fn test_replaceText_shouldRewriteTextRunsOnly() {
                check_replace_text($open());
            }

            #[test]
            fn test_removeDuplicates_twice_shouldRemoveNothingMore() {
                check_remove_duplicates_is_idempotent($open());
            }

            #[test]
            fn test_consolidateUnits_withBlankMember_shouldKeepOneUnit() {
                check_consolidation_scenario($open());
            }

            #[test]
            fn test_consolidateUnits_shouldNotIncreaseSourceCoverage() {
                check_consolidation_never_adds_source_units($open());
            }

            #[test]
            fn test_removeSameAsSource_shouldCompareStructurally() {
                check_remove_same_as_source($open());
            }

            #[test]
            fn test_removeSpacesAndTags_shouldRewriteSegments() {
                check_spaces_and_tags($open());
            }

            #[test]
            fn test_languageManagement_shouldKeepHeaderInSync() {
                check_language_management($open());
            }

            #[test]
            fn test_languages_differingOnlyByCase_shouldStaySeparate() {
                check_case_colliding_languages($open());
            }

            #[test]
            fn test_exportFile_shouldIgnorePagination() {
                check_export($open());
            }

            #[test]
            fn test_metadataSetters_shouldPersist() {
                check_metadata_edits($open());
            }

            #[test]
            fn test_statistics_shouldCountWords() {
                check_statistics($open());
            }

            #[test]
            fn test_markClosing_shouldRefuseWrites() {
                check_closing_refuses_writes($open());
            }

            #[test]
            fn test_writeFile_shouldKeepMetadataAttributesAndHeaderExtensions() {
                check_metadata_survives_write($open());
            }

            #[test]
            fn test_batch_failingPartway_shouldRollBack() {
                check_failed_batch_rolls_back($backend());
            }
        }
    };
}

conformance_suite!(memory, common::memory_store, common::memory_backend);
conformance_suite!(sqlite, common::sqlite_store, common::sqlite_backend);
