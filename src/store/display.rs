/*!
 * Editor-facing rendering of segments.
 *
 * Text is XML-escaped; every inline element is replaced by a placeholder
 * `<tag data-ref="N"/>` whose fragment is kept in the corpus tag table, so
 * edited text can be turned back into the original markup byte for byte.
 * `hi` and `sub` are split into an opening and a closing placeholder with
 * their translatable content rendered between them. Filter matches are
 * wrapped in `<mark>`/`</mark>`, computed on the pure-text projection.
 */

use once_cell::sync::Lazy;
use quick_xml::escape::{escape, partial_escape, unescape};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use crate::errors::{Result, TmxError, malformed};
use crate::model::{Node, Segment, TranslationUnit, segment::TEXT_CONTAINERS};
use crate::store::query::TextFilter;
use crate::xml::reader::parse_segment;
use crate::xml::writer::{element_to_string, end_tag, start_tag};

pub const MARK_START: &str = "<mark>";
pub const MARK_END: &str = "</mark>";

// @const: placeholders and highlight markers inside edited text
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<tag\s+data-ref="(\d+)"\s*/>|</?mark>"#).unwrap()
});

/// Placeholder for a tag reference
pub fn placeholder(reference: usize) -> String {
    format!("<tag data-ref=\"{}\"/>", reference)
}

/// Interned inline-markup fragments, referenced from 1
#[derive(Debug, Default)]
pub struct TagTable {
    fragments: Vec<String>,
    refs: HashMap<String, usize>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference for a fragment, reusing an existing one when possible
    pub fn intern(&mut self, fragment: String) -> usize {
        if let Some(reference) = self.refs.get(&fragment) {
            return *reference;
        }
        self.fragments.push(fragment.clone());
        let reference = self.fragments.len();
        self.refs.insert(fragment, reference);
        reference
    }

    pub fn fragment(&self, reference: usize) -> Option<&str> {
        reference
            .checked_sub(1)
            .and_then(|index| self.fragments.get(index))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

struct Renderer<'a> {
    tags: &'a mut TagTable,
    ranges: &'a [Range<usize>],
    offset: usize,
    marking: bool,
    out: String,
}

impl Renderer<'_> {
    fn set_marking(&mut self, marking: bool) {
        if marking != self.marking {
            self.out.push_str(if marking { MARK_START } else { MARK_END });
            self.marking = marking;
        }
    }

    fn covering(&self, at: usize) -> Option<&Range<usize>> {
        self.ranges.iter().find(|r| r.start <= at && at < r.end)
    }

    fn text(&mut self, text: &str) {
        let start = self.offset;
        let end = start + text.len();
        let mut cursor = start;
        while cursor < end {
            let (inside, next) = match self.covering(cursor) {
                Some(range) => (true, range.end.min(end)),
                None => (
                    false,
                    self.ranges
                        .iter()
                        .map(|r| r.start)
                        .filter(|s| *s > cursor && *s < end)
                        .min()
                        .unwrap_or(end),
                ),
            };
            self.set_marking(inside);
            self.out
                .push_str(&escape(&text[cursor - start..next - start]));
            cursor = next;
        }
        self.offset = end;
        if self.marking && self.covering(end).is_none() {
            self.set_marking(false);
        }
    }

    fn placeholder(&mut self, fragment: String) {
        let reference = self.tags.intern(fragment);
        let marking = self.marking;
        self.set_marking(false);
        self.out.push_str(&placeholder(reference));
        self.set_marking(marking);
    }

    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Text(text) => self.text(text),
                Node::Element(element) if TEXT_CONTAINERS.contains(&element.name.as_str()) => {
                    self.placeholder(start_tag(element));
                    self.nodes(&element.children);
                    self.placeholder(end_tag(element));
                }
                Node::Element(element) => self.placeholder(element_to_string(element)),
            }
        }
    }
}

/// Render a segment for editing, highlighting `ranges` of its pure text
pub fn render(segment: &Segment, tags: &mut TagTable, ranges: &[Range<usize>]) -> String {
    let mut renderer = Renderer {
        tags,
        ranges,
        offset: 0,
        marking: false,
        out: String::new(),
    };
    renderer.nodes(segment.nodes());
    renderer.set_marking(false);
    renderer.out
}

/// Turn edited text back into a segment, restoring tags from the table
pub fn resolve(value: &str, tags: &TagTable) -> Result<Segment> {
    let mut xml = String::with_capacity(value.len() + 11);
    xml.push_str("<seg>");
    let mut last = 0;
    for token in TOKEN_REGEX.captures_iter(value) {
        let whole = token.get(0).map(|m| m.range()).unwrap_or(last..last);
        push_text(&mut xml, &value[last..whole.start])?;
        if let Some(reference) = token.get(1) {
            let fragment = reference
                .as_str()
                .parse::<usize>()
                .ok()
                .and_then(|r| tags.fragment(r))
                .ok_or_else(|| TmxError::UnknownTag(reference.as_str().to_string()))?;
            xml.push_str(fragment);
        }
        last = whole.end;
    }
    push_text(&mut xml, &value[last..])?;
    xml.push_str("</seg>");
    parse_segment(&xml)
}

fn push_text(xml: &mut String, escaped: &str) -> Result<()> {
    let text = unescape(escaped).map_err(malformed)?;
    xml.push_str(&partial_escape(&*text));
    Ok(())
}

/// One row of a unit listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitView {
    /// 1-based number within the filtered result
    pub count: usize,
    pub id: String,
    pub position: i64,
    /// Rendered segment per language
    pub variants: BTreeMap<String, String>,
}

impl UnitView {
    /// Render every variant, highlighting matches in the filtered language
    pub fn build(
        count: usize,
        unit: &TranslationUnit,
        tags: &mut TagTable,
        highlight: Option<&TextFilter>,
    ) -> Self {
        let variants = unit
            .variants
            .iter()
            .map(|(lang, variant)| {
                let ranges = match highlight {
                    Some(filter) if filter.language == *lang => {
                        filter.matcher.find_ranges(&variant.pure_text())
                    }
                    _ => Vec::new(),
                };
                (lang.clone(), render(&variant.segment, tags, &ranges))
            })
            .collect();
        Self {
            count,
            id: unit.id.clone(),
            position: unit.position,
            variants,
        }
    }
}
