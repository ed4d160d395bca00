/*!
 * Tests for segments, units and the header
 */

use tmxstore::model::{ALL_LANGUAGES, Header, Segment, TranslationUnit};
use tmxstore::xml::parse_segment;

fn seg(xml: &str) -> Segment {
    parse_segment(&format!("<seg>{}</seg>", xml)).unwrap()
}

#[test]
fn test_pureText_shouldDescendOnlyIntoTextContainers() {
    let segment = seg(r#"Press <bpt i="1">&lt;b&gt;</bpt><hi type="x">Enter</hi><ept i="1">&lt;/b&gt;</ept> <ph x="2">{0}</ph>now"#);
    assert_eq!(segment.pure_text(), "Press Enter now");
    assert!(segment.has_tags());
}

#[test]
fn test_structurallyEqual_withSplitTextRuns_shouldMatch() {
    let merged = Segment::from_text("Hello world");
    let split = Segment::new(vec![
        tmxstore::model::Node::Text("Hello ".to_string()),
        tmxstore::model::Node::Text(String::new()),
        tmxstore::model::Node::Text("world".to_string()),
    ]);
    assert!(merged.structurally_equal(&split));
}

#[test]
fn test_structurallyEqual_withDifferentAttributes_shouldDiffer() {
    let a = seg(r#"A <ph x="1"/>"#);
    let b = seg(r#"A <ph x="2"/>"#);
    assert!(!a.structurally_equal(&b));
    assert_eq!(a.pure_text(), b.pure_text());
}

#[test]
fn test_isBlank_withWhitespaceAndTags_shouldBeBlank() {
    assert!(seg(r#"  <ph x="1"/> "#).is_blank());
    assert!(!seg(r#"<hi>x</hi>"#).is_blank());
    assert!(Segment::default().is_empty());
}

#[test]
fn test_rewriteText_shouldLeaveTagsUntouched() {
    let mut segment = seg(r#"cat <ph x="1">cat</ph> <sub>cat</sub>"#);
    let changed = segment.rewrite_text(&mut |text: &str| text.replace("cat", "dog"));
    assert!(changed);
    assert_eq!(segment.pure_text(), "dog  dog");
    assert!(segment.structurally_equal(&seg(r#"dog <ph x="1">cat</ph> <sub>dog</sub>"#)));
}

#[test]
fn test_isUntranslated_shouldIgnoreSourceAndBlankVariants() {
    let unit = TranslationUnit::new("1")
        .with_variant("en", "Hello")
        .with_variant("fr", "  ");
    assert!(unit.is_untranslated("en"));
    assert!(!unit.is_untranslated("fr"));
}

#[test]
fn test_sameContent_withMissingLanguage_shouldDiffer() {
    let a = TranslationUnit::new("a").with_variant("en", "Hi").with_variant("fr", "Salut");
    let b = TranslationUnit::new("b").with_variant("en", "Hi");
    let c = TranslationUnit::new("c").with_variant("en", "Hi").with_variant("fr", "Salut");
    assert!(!a.same_content(&b));
    assert!(a.same_content(&c));
}

#[test]
fn test_header_default_shouldUseAllLanguages() {
    let mut header = Header::default();
    assert_eq!(header.srclang(), ALL_LANGUAGES);
    header.set_srclang("de");
    assert_eq!(header.attribute("srclang"), Some("de"));
    assert_eq!(Header::new("fr").srclang(), "fr");
}
