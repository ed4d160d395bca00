/*!
 * Tests for splitting and merging TMX files
 */

use tmxstore::model::ALL_LANGUAGES;
use tmxstore::xml::{TmxEvent, TmxReader};
use tmxstore::{merge_files, split_file};

use crate::common;

fn header_srclang(path: &std::path::Path) -> String {
    for event in TmxReader::from_path(path).unwrap() {
        if let TmxEvent::Header(header) = event.unwrap() {
            return header.srclang().to_string();
        }
    }
    panic!("no header in {:?}", path);
}

#[test]
fn test_splitThenMerge_shouldKeepEveryUnit() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "corpus.tmx", &common::sample_corpus()).unwrap();

    let parts = split_file(&input, 3, 2).unwrap();
    assert_eq!(parts.len(), 3);
    let sizes: Vec<usize> = parts
        .iter()
        .map(|p| common::read_units(p).unwrap().len())
        .collect();
    // The unit without a valid language is not copied
    assert_eq!(sizes, vec![2, 2, 1]);
    assert!(parts.iter().all(|p| header_srclang(p) == "en"));

    let merged = dir.path().join("merged.tmx");
    assert_eq!(merge_files(&parts, &merged, 2).unwrap(), 5);
    let original: Vec<_> = common::read_units(&input)
        .unwrap()
        .into_iter()
        .filter(|u| !u.variants.is_empty())
        .collect();
    let restored = common::read_units(&merged).unwrap();
    assert_eq!(restored.len(), original.len());
    for (a, b) in original.iter().zip(&restored) {
        assert_eq!(a.id, b.id);
        assert!(a.same_content(b));
    }
    assert_eq!(header_srclang(&merged), "en");
}

#[test]
fn test_mergeFiles_withConflictingSources_shouldUseAllLanguages() {
    let dir = common::create_temp_dir().unwrap();
    let a = common::create_test_file(
        dir.path(),
        "a.tmx",
        &common::tmx_document("en", &common::tu("1", &[("en", "One")])),
    )
    .unwrap();
    let b = common::create_test_file(
        dir.path(),
        "b.tmx",
        &common::tmx_document("de", &common::tu("1", &[("de", "Eins")])),
    )
    .unwrap();
    let merged = dir.path().join("merged.tmx");

    assert_eq!(merge_files(&[a, b], &merged, 0).unwrap(), 2);
    assert_eq!(header_srclang(&merged), ALL_LANGUAGES);
}

#[test]
fn test_splitFile_withOnePart_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "corpus.tmx", &common::sample_corpus()).unwrap();
    assert!(split_file(&input, 1, 2).is_err());
}
