/*!
 * Translation units, variants and the corpus header.
 *
 * These are plain values: the store owns them, the reader produces them and
 * the writer consumes them.
 */

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::segment::{Element, Segment};

/// `srclang` value for corpora that mix source languages
pub const ALL_LANGUAGES: &str = "*all*";

/// `<prop type="...">value</prop>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub kind: String,
    pub lang: Option<String>,
    /// Attributes other than `type` and `xml:lang`, such as `o-encoding`
    pub attributes: Vec<(String, String)>,
    pub value: String,
}

impl Property {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            lang: None,
            attributes: Vec::new(),
            value: value.into(),
        }
    }
}

/// `<note>text</note>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub lang: Option<String>,
    /// Attributes other than `xml:lang`
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl Note {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            lang: None,
            attributes: Vec::new(),
            text: text.into(),
        }
    }
}

/// Language-specific content of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnitVariant {
    pub lang: String,
    /// Attributes other than `xml:lang`
    pub attributes: Vec<(String, String)>,
    pub props: Vec<Property>,
    pub notes: Vec<Note>,
    pub segment: Segment,
}

impl TranslationUnitVariant {
    pub fn new(lang: impl Into<String>, segment: Segment) -> Self {
        Self {
            lang: lang.into(),
            attributes: Vec::new(),
            props: Vec::new(),
            notes: Vec::new(),
            segment,
        }
    }

    /// Variant holding plain text
    pub fn from_text(lang: impl Into<String>, text: &str) -> Self {
        Self::new(lang, Segment::from_text(text))
    }

    pub fn pure_text(&self) -> String {
        self.segment.pure_text()
    }

    pub fn is_blank(&self) -> bool {
        self.segment.is_blank()
    }
}

/// One aligned record of the corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Unique id, written back as `tuid`
    pub id: String,
    /// Document order, assigned by the store
    pub position: i64,
    /// Attributes other than `tuid`
    pub attributes: Vec<(String, String)>,
    pub props: Vec<Property>,
    pub notes: Vec<Note>,
    /// Variants keyed by language code
    pub variants: BTreeMap<String, TranslationUnitVariant>,
}

impl TranslationUnit {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Add a variant, keeping the first one seen for a language.
    ///
    /// Returns false if the language was already present.
    pub fn add_variant(&mut self, variant: TranslationUnitVariant) -> bool {
        if self.variants.contains_key(&variant.lang) {
            return false;
        }
        self.variants.insert(variant.lang.clone(), variant);
        true
    }

    /// Builder used mostly by tests and tools
    pub fn with_variant(mut self, lang: &str, text: &str) -> Self {
        self.add_variant(TranslationUnitVariant::from_text(lang, text));
        self
    }

    pub fn variant(&self, lang: &str) -> Option<&TranslationUnitVariant> {
        self.variants.get(lang)
    }

    /// Pure text for a language, empty when absent
    pub fn pure_text(&self, lang: &str) -> String {
        self.variants
            .get(lang)
            .map(|v| v.pure_text())
            .unwrap_or_default()
    }

    /// True if no language other than `source` has non-blank text
    pub fn is_untranslated(&self, source: &str) -> bool {
        self.variants
            .iter()
            .filter(|(lang, _)| lang.as_str() != source)
            .all(|(_, v)| v.is_blank())
    }

    /// Same content per language, ignoring ids, positions and metadata
    pub fn same_content(&self, other: &TranslationUnit) -> bool {
        self.variants.len() == other.variants.len()
            && self.variants.iter().all(|(lang, v)| {
                other
                    .variants
                    .get(lang)
                    .is_some_and(|o| v.segment.structurally_equal(&o.segment))
            })
    }

    /// Copy of the unit without its variants
    pub fn shell(&self) -> TranslationUnit {
        TranslationUnit {
            id: self.id.clone(),
            position: self.position,
            attributes: self.attributes.clone(),
            props: self.props.clone(),
            notes: self.notes.clone(),
            variants: BTreeMap::new(),
        }
    }
}

/// Corpus-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub attributes: Vec<(String, String)>,
    pub props: Vec<Property>,
    pub notes: Vec<Note>,
    /// Other children, such as `<ude>`, kept verbatim
    pub extensions: Vec<Element>,
}

impl Header {
    /// Header with the attributes TMX 1.4 requires
    pub fn new(srclang: &str) -> Self {
        let attributes = vec![
            ("creationtool".to_string(), env!("CARGO_PKG_NAME").to_string()),
            (
                "creationtoolversion".to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
            ),
            ("srclang".to_string(), srclang.to_string()),
            ("adminlang".to_string(), "en".to_string()),
            ("datatype".to_string(), "xml".to_string()),
            ("o-tmf".to_string(), "unknown".to_string()),
            ("segtype".to_string(), "block".to_string()),
            (
                "creationdate".to_string(),
                Utc::now().format("%Y%m%dT%H%M%SZ").to_string(),
            ),
        ];
        Self {
            attributes,
            props: Vec::new(),
            notes: Vec::new(),
            extensions: Vec::new(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
    }

    /// Declared source language, `*all*` when unset
    pub fn srclang(&self) -> &str {
        self.attribute("srclang").unwrap_or(ALL_LANGUAGES)
    }

    pub fn set_srclang(&mut self, lang: &str) {
        self.set_attribute("srclang", lang);
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new(ALL_LANGUAGES)
    }
}
