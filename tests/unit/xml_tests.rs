/*!
 * Tests for the streaming TMX reader and writer
 */

use std::io::Cursor;
use tmxstore::model::Header;
use tmxstore::xml::{TmxEvent, TmxReader, TmxWriter};
use tmxstore::{TmxError, TranslationUnit};

use crate::common;

fn events(xml: &str) -> Vec<TmxEvent> {
    TmxReader::new(Cursor::new(xml.as_bytes().to_vec()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn test_reader_shouldYieldHeaderThenUnits() {
    let xml = common::sample_corpus();
    let mut reader = TmxReader::new(Cursor::new(xml.into_bytes()));
    let mut kinds = Vec::new();
    while let Some(event) = reader.next_event().unwrap() {
        kinds.push(match event {
            TmxEvent::Header(h) => format!("header:{}", h.srclang()),
            TmxEvent::Unit(u) => format!("unit:{}:{}", u.id, u.variants.len()),
        });
    }
    assert_eq!(kinds[0], "header:en");
    assert_eq!(kinds[5], "unit:5:0");
    assert_eq!(reader.units_read(), 6);
    assert_eq!(reader.variants_dropped(), 1);
    assert_eq!(reader.version(), Some("1.4"));
}

#[test]
fn test_reader_withRepeatedLanguage_shouldKeepFirst() {
    let xml = common::tmx_document(
        "en",
        r#"<tu><tuv xml:lang="en"><seg>one</seg></tuv><tuv xml:lang="en"><seg>two</seg></tuv></tu>"#,
    );
    let units: Vec<TranslationUnit> = events(&xml)
        .into_iter()
        .filter_map(|e| match e {
            TmxEvent::Unit(u) => Some(u),
            TmxEvent::Header(_) => None,
        })
        .collect();
    assert_eq!(units[0].pure_text("en"), "one");
}

#[test]
fn test_reader_withUnbalancedTags_shouldFail() {
    let xml = r#"<tmx version="1.4"><header srclang="en"/><body><tu><tuv xml:lang="en"><seg>x</tuv></tu></body></tmx>"#;
    let result: Result<Vec<_>, TmxError> = TmxReader::new(Cursor::new(xml.as_bytes().to_vec())).collect();
    assert!(result.is_err());
}

#[test]
fn test_writer_shouldEscapeAndSkipEmptyUnits() {
    let mut writer = TmxWriter::new(Vec::new(), 2);
    writer.begin(&Header::new("en")).unwrap();
    assert!(writer
        .write_unit(&TranslationUnit::new("1").with_variant("en", "a < b & c"))
        .unwrap());
    assert!(!writer.write_unit(&TranslationUnit::new("2")).unwrap());
    assert_eq!(writer.units_written(), 1);
    let bytes = writer.finish().unwrap();
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<!DOCTYPE tmx"));
    assert!(text.contains("a &lt; b &amp; c"));
    assert!(text.contains(r#"tuid="1""#));
    assert!(!text.contains(r#"tuid="2""#));
    assert!(text.trim_end().ends_with("</tmx>"));

    let reread: Vec<TmxEvent> = events(&text);
    assert_eq!(reread.len(), 2);
}
